//! Resource registry
//!
//! Maps resource and data source type names to their handlers, so the
//! apply engine can dispatch on the `type` of a declared block without a
//! hardcoded match.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use forwardemail_core::resources::forwardemail_registry;
//!
//! let registry = forwardemail_registry(client);
//! let domain = registry.resource("forwardemail_domain")?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::traits::{DataSourceHandler, ResourceHandler};

/// Registry of resource and data source handlers
///
/// Built once at startup and read-only afterwards; handlers are shared
/// behind `Arc` so the engine can hold them across awaits.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: HashMap<&'static str, Arc<dyn ResourceHandler>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSourceHandler>>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource handler under its type name
    ///
    /// A later registration for the same type name replaces the earlier one.
    pub fn register_resource(&mut self, handler: Arc<dyn ResourceHandler>) {
        self.resources.insert(handler.type_name(), handler);
    }

    /// Register a data source handler under its type name
    pub fn register_data_source(&mut self, handler: Arc<dyn DataSourceHandler>) {
        self.data_sources.insert(handler.type_name(), handler);
    }

    /// Look up a resource handler
    ///
    /// # Returns
    ///
    /// - `Ok(handler)`: The registered handler
    /// - `Err(Error::UnknownResourceType)`: Nothing registered under `type_name`
    pub fn resource(&self, type_name: &str) -> Result<Arc<dyn ResourceHandler>> {
        self.resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| Error::UnknownResourceType(type_name.to_string()))
    }

    /// Look up a data source handler
    pub fn data_source(&self, type_name: &str) -> Result<Arc<dyn DataSourceHandler>> {
        self.data_sources
            .get(type_name)
            .cloned()
            .ok_or_else(|| Error::UnknownResourceType(format!("data.{type_name}")))
    }

    /// List all registered resource type names, sorted
    pub fn list_resources(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.resources.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// List all registered data source type names, sorted
    pub fn list_data_sources(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.data_sources.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn has_resource(&self, type_name: &str) -> bool {
        self.resources.contains_key(type_name)
    }

    pub fn has_data_source(&self, type_name: &str) -> bool {
        self.data_sources.contains_key(type_name)
    }
}

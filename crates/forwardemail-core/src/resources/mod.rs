//! Built-in resource and data source handlers
//!
//! - [`domain`]: `forwardemail_domain`
//! - [`alias`]: `forwardemail_alias`
//! - [`account`]: `forwardemail_account` (data source)

pub mod account;
pub mod alias;
pub mod domain;

use std::sync::Arc;

use crate::registry::ResourceRegistry;
use crate::traits::ForwardEmailApi;

pub use account::AccountDataSource;
pub use alias::{AliasId, AliasResource};
pub use domain::DomainResource;

/// Build a registry with every built-in handler sharing one client handle
pub fn forwardemail_registry(client: Arc<dyn ForwardEmailApi>) -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();
    registry.register_resource(Arc::new(DomainResource::new(Arc::clone(&client))));
    registry.register_resource(Arc::new(AliasResource::new(Arc::clone(&client))));
    registry.register_data_source(Arc::new(AccountDataSource::new(client)));
    registry
}

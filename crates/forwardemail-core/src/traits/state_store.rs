// # State Store Trait
//
// Defines the interface for host-managed resource state.
//
// ## Purpose
//
// The state store records, per resource address, the identity key and the
// attributes last written back by the provider. The apply engine uses it
// to decide between create, update and delete, and the change reconciler
// diffs declared values against it.
//
// ## Implementations
//
// - File-based: JSON file with atomic writes
// - In-memory: tests and dry runs
//
// ## Usage
//
// ```rust,ignore
// use forwardemail_core::{StateStore, ResourceState};
//
// async fn remember(store: &dyn StateStore, state: ResourceState) -> forwardemail_core::Result<()> {
//     store.set_state("forwardemail_domain.main", &state).await?;
//     store.flush().await
// }
// ```

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Recorded state of one resource instance
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceState {
    /// Resource type name (e.g. `forwardemail_domain`)
    pub resource_type: String,
    /// Identity key the remote uses to address the entity
    pub id: String,
    /// Attributes as last written back by the provider
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Timestamp of the last write
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

impl ResourceState {
    pub fn new(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        attributes: Map<String, Value>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            attributes,
            last_updated: chrono::Utc::now(),
        }
    }
}

/// Trait for state store implementations
///
/// Keys are resource addresses (`<type>.<name>` or `data.<type>.<name>`).
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// ## Implementation Guidelines
///
/// - **Async I/O only**: Use async file operations, never blocking I/O
/// - **Explicit flush**: `flush()` must persist all pending changes
/// - **No business logic**: stores never decide what to create or delete
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the recorded state for an address
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ResourceState))`: The recorded state
    /// - `Ok(None)`: Nothing recorded
    /// - `Err(Error)`: Storage error
    async fn get_state(&self, address: &str) -> Result<Option<ResourceState>, crate::Error>;

    /// Create or replace the recorded state for an address
    async fn set_state(&self, address: &str, state: &ResourceState)
    -> Result<(), crate::Error>;

    /// Delete the recorded state for an address
    ///
    /// Succeeds when nothing was recorded.
    async fn delete_state(&self, address: &str) -> Result<(), crate::Error>;

    /// List all recorded addresses
    async fn list_addresses(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Holds resource state for the lifetime of the process only. Used by tests
// and by dry runs that must not touch the persisted state file.
//
// ## Crash Behavior
//
// - All state is lost on exit
// - The next pass treats every declared resource as new

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::traits::state_store::{ResourceState, StateStore};
use crate::Error;

/// In-memory state store implementation
///
/// # Example
///
/// ```rust,no_run
/// use forwardemail_core::state::MemoryStateStore;
/// use forwardemail_core::traits::{ResourceState, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///
///     let state = ResourceState::new("forwardemail_domain", "example.com", Default::default());
///     store.set_state("forwardemail_domain.main", &state).await?;
///
///     let loaded = store.get_state("forwardemail_domain.main").await?;
///     assert_eq!(loaded.map(|s| s.id), Some("example.com".to_string()));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<HashMap<String, ResourceState>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_state(&self, address: &str) -> Result<Option<ResourceState>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(address).cloned())
    }

    async fn set_state(&self, address: &str, state: &ResourceState) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(address.to_string(), state.clone());
        Ok(())
    }

    async fn delete_state(&self, address: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(address);
        Ok(())
    }

    async fn list_addresses(&self) -> Result<Vec<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}

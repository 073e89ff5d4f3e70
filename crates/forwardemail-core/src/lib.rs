// # forwardemail-core
//
// Core library for the Forward Email provider.
//
// ## Architecture Overview
//
// This library manages Forward Email domains and aliases declaratively:
// - **ForwardEmailApi**: Trait for the remote management API (one client per process)
// - **ResourceHandler / DataSourceHandler**: Lifecycle callbacks per resource type
// - **Reconciler**: Builds sparse create/update payloads from declared vs. prior attributes
// - **Writer**: Writes remote entities back into attribute bags
// - **StateStore**: Trait for persistent resource state between passes
// - **ApplyEngine**: Plans and applies a manifest against recorded state
// - **ResourceRegistry**: Type name → handler dispatch
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Handlers never talk HTTP; the client never sees attribute bags
// 2. **Sparse Updates**: Only changed domain toggles are sent; alias updates carry every flag and list
// 3. **Injected Client**: Handlers receive the shared client at construction
// 4. **Library-First**: The binary is a thin shell over this crate
// 5. **Idempotency**: Re-applying an unchanged manifest makes no remote mutations

pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod registry;
pub mod resource_data;
pub mod resources;
pub mod schema;
pub mod state;
pub mod traits;
pub mod writer;

// Re-export core types for convenience
pub use config::{DataSourceConfig, EngineConfig, Manifest, ProviderConfig, ResourceConfig};
pub use engine::{Action, ApplyEngine, ApplySummary, EngineEvent, Plan, PlannedChange};
pub use error::{Error, Result};
pub use registry::ResourceRegistry;
pub use resource_data::ResourceData;
pub use resources::forwardemail_registry;
pub use schema::{Attribute, AttributeType, Schema};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{
    ApiClientFactory, DataSourceHandler, ForwardEmailApi, ReadOutcome, ResourceHandler,
    ResourceState, StateStore,
};

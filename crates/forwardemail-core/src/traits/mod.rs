//! Core traits for the Forward Email provider
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ForwardEmailApi`]: Remote API operations
//! - [`ResourceHandler`] / [`DataSourceHandler`]: Lifecycle callbacks per resource type
//! - [`StateStore`]: Host-managed resource state

pub mod api_client;
pub mod resource;
pub mod state_store;

pub use api_client::{
    Account, Alias, AliasParameters, ApiClientFactory, Domain, DomainParameters, DomainRef,
    ForwardEmailApi,
};
pub use resource::{DataSourceHandler, ReadOutcome, ResourceHandler};
pub use state_store::{ResourceState, StateStore};

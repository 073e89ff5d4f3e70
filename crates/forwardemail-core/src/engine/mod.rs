//! Apply engine
//!
//! The ApplyEngine plays the orchestration host's part of a
//! reconciliation pass:
//! - Validating declared attributes against each type's schema
//! - Refreshing recorded state from the remote
//! - Planning create / update / replace / delete per address
//! - Invoking resource handlers and persisting what they write back
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Manifest   │─── declared attributes ───┐
//! └─────────────┘                           │
//!                                           ▼
//!                                  ┌──────────────┐
//!                                  │ ApplyEngine  │
//!                                  └──────────────┘
//!                                           │
//!         ┌─────────────────────────────────┼───────────────────────────┐
//!         │                                 │                           │
//!         ▼                                 ▼                           ▼
//! ┌─────────────┐               ┌────────────────────┐          ┌─────────────┐
//! │ StateStore  │               │ ResourceRegistry   │          │   Events    │
//! │ (prior)     │               │ (handlers → API)   │          │  (notify)   │
//! └─────────────┘               └────────────────────┘          └─────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Validate every declared block (config errors abort before any remote call)
//! 2. Refresh recorded state; absent entities are planned for recreation,
//!    absent orphans only lose their state
//! 3. Diff declared attributes against refreshed state
//! 4. Execute changes serially, lower apply rank first (deletes in reverse)
//! 5. Persist state after each successful step
//!
//! A failing resource is recorded in the [`ApplySummary`]; the pass moves
//! on to the next one.

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{EngineConfig, Manifest};
use crate::error::{Error, Result};
use crate::registry::ResourceRegistry;
use crate::resource_data::ResourceData;
use crate::traits::{ReadOutcome, ResourceHandler, ResourceState, StateStore};

/// Prefix of data source addresses in state
const DATA_PREFIX: &str = "data.";

/// What a pass will do to one address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    /// A force-new attribute changed: delete, then create
    Replace,
    Delete,
    /// Data source read
    Read,
    NoOp,
}

impl Action {
    /// Whether the action calls a mutating remote operation
    pub fn is_mutating(self) -> bool {
        !matches!(self, Action::Read | Action::NoOp)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Replace => "replace",
            Action::Delete => "delete",
            Action::Read => "read",
            Action::NoOp => "no-op",
        };
        f.write_str(s)
    }
}

/// One planned step
#[derive(Debug, Clone)]
pub struct PlannedChange {
    /// State address (`<type>.<name>` or `data.<type>.<name>`)
    pub address: String,
    pub resource_type: String,
    pub action: Action,
    /// Declared attributes that differ from refreshed state
    pub changed_attributes: Vec<String>,
    prior: Option<ResourceState>,
    declared: Map<String, Value>,
    /// Delete of an entity already gone remotely: only state is dropped
    remote_absent: bool,
}

/// A step that failed during planning or applying
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFailure {
    pub address: String,
    pub action: Option<Action>,
    pub error: String,
}

/// Result of planning a pass
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,
    /// Addresses whose refresh failed; they are left untouched
    pub failures: Vec<ResourceFailure>,
}

impl Plan {
    /// Planned action for an address
    pub fn action_for(&self, address: &str) -> Option<Action> {
        self.changes
            .iter()
            .find(|c| c.address == address)
            .map(|c| c.action)
    }

    /// Number of changes with the given action
    pub fn count(&self, action: Action) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }

    /// True when nothing would be mutated remotely
    pub fn is_empty(&self) -> bool {
        !self.changes.iter().any(|c| c.action.is_mutating())
    }
}

/// Result of an apply or destroy pass
#[derive(Debug, Clone, Default)]
pub struct ApplySummary {
    /// Steps that completed
    pub applied: Vec<(String, Action)>,
    /// Steps that were only logged (dry run)
    pub skipped: Vec<(String, Action)>,
    pub failures: Vec<ResourceFailure>,
}

impl ApplySummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Events emitted by the ApplyEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Pass started
    PassStarted { resources_count: usize },

    /// Recorded state was refreshed from the remote
    Refreshed { address: String },

    /// The remote entity for a recorded address no longer exists
    RemoteAbsent { address: String },

    /// A step is about to run
    ChangeStarted { address: String, action: Action },

    /// A step completed
    ChangeSucceeded { address: String, action: Action },

    /// A step failed
    ChangeFailed {
        address: String,
        action: Action,
        error: String,
    },

    /// Pass finished
    PassFinished { applied: usize, failed: usize },
}

/// Reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`ApplyEngine::new()`]
/// 2. Call [`ApplyEngine::plan()`], [`ApplyEngine::apply()`] or
///    [`ApplyEngine::destroy()`] once per pass
///
/// ## Threading
///
/// Steps run one at a time; handlers never see concurrent calls for the
/// same address.
pub struct ApplyEngine {
    /// Handlers for every known type
    registry: ResourceRegistry,

    /// Recorded state
    state_store: Box<dyn StateStore>,

    /// Plan and log only
    dry_run: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ApplyEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        registry: ResourceRegistry,
        state_store: Box<dyn StateStore>,
        config: EngineConfig,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity.max(1));

        let engine = Self {
            registry,
            state_store,
            dry_run: config.dry_run,
            event_tx: tx,
        };

        (engine, rx)
    }

    pub fn state_store(&self) -> &dyn StateStore {
        self.state_store.as_ref()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Compute the changes needed to reach the declared state
    ///
    /// Refreshes recorded state from the remote but never mutates anything,
    /// remote or local.
    pub async fn plan(&self, manifest: &Manifest) -> Result<Plan> {
        manifest.validate()?;

        // Config errors abort before any remote call
        let mut declared = Vec::with_capacity(manifest.resources.len());
        for resource in &manifest.resources {
            let handler = self.registry.resource(&resource.resource_type)?;
            let normalized = handler.schema().normalize(&resource.attributes).map_err(|e| {
                Error::config(format!("{}: {}", resource.address(), e))
            })?;
            declared.push((resource, handler, normalized));
        }
        for data in &manifest.data {
            self.registry.data_source(&data.data_type)?;
        }

        let mut plan = Plan::default();
        let mut declared_addresses = HashSet::new();

        for (resource, handler, normalized) in declared {
            let address = resource.address();
            declared_addresses.insert(address.clone());

            match self.plan_resource(&address, handler.as_ref(), normalized).await {
                Ok(change) => plan.changes.push(change),
                Err(e) => {
                    error!("Failed to refresh {}: {}", address, e);
                    plan.failures.push(ResourceFailure {
                        address,
                        action: None,
                        error: e.to_string(),
                    });
                }
            }
        }

        for data in &manifest.data {
            let address = data.address();
            declared_addresses.insert(address.clone());
            plan.changes.push(PlannedChange {
                address,
                resource_type: data.data_type.clone(),
                action: Action::Read,
                changed_attributes: Vec::new(),
                prior: None,
                declared: Map::new(),
                remote_absent: false,
            });
        }

        // Recorded resources that are no longer declared
        let mut orphans = self.state_store.list_addresses().await?;
        orphans.sort();
        for address in orphans {
            if declared_addresses.contains(&address) || address.starts_with(DATA_PREFIX) {
                continue;
            }
            let Some(state) = self.state_store.get_state(&address).await? else {
                continue;
            };
            match self.plan_delete(&address, state).await {
                Ok(change) => plan.changes.push(change),
                Err(e) => {
                    error!("Failed to refresh {}: {}", address, e);
                    plan.failures.push(ResourceFailure {
                        address,
                        action: Some(Action::Delete),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.order_changes(&mut plan.changes);

        info!(
            "Plan: {} to create, {} to update, {} to replace, {} to delete",
            plan.count(Action::Create),
            plan.count(Action::Update),
            plan.count(Action::Replace),
            plan.count(Action::Delete)
        );

        Ok(plan)
    }

    /// Refresh and diff one declared resource
    async fn plan_resource(
        &self,
        address: &str,
        handler: &dyn ResourceHandler,
        declared: Map<String, Value>,
    ) -> Result<PlannedChange> {
        let resource_type = handler.type_name().to_string();
        let mut change = PlannedChange {
            address: address.to_string(),
            resource_type: resource_type.clone(),
            action: Action::Create,
            changed_attributes: Vec::new(),
            prior: None,
            declared,
            remote_absent: false,
        };

        let Some(recorded) = self.state_store.get_state(address).await? else {
            debug!("{} has no recorded state", address);
            return Ok(change);
        };

        if recorded.resource_type != resource_type {
            return Err(Error::config(format!(
                "{} is recorded as {}, declared as {}",
                address, recorded.resource_type, resource_type
            )));
        }

        let mut d = ResourceData::from_state(handler.schema(), &recorded);
        match handler.read(&mut d).await? {
            ReadOutcome::Absent => {
                info!("{} was deleted outside of this provider; planning recreation", address);
                self.emit_event(EngineEvent::RemoteAbsent {
                    address: address.to_string(),
                });
                return Ok(change);
            }
            ReadOutcome::Found => {
                self.emit_event(EngineEvent::Refreshed {
                    address: address.to_string(),
                });
            }
        }

        let refreshed = d
            .into_state(&resource_type)
            .ok_or_else(|| Error::Other(format!("{address} lost its identity key on read")))?;

        change.changed_attributes = change
            .declared
            .iter()
            .filter(|(key, value)| refreshed.attributes.get(key.as_str()) != Some(value))
            .map(|(key, _)| key.clone())
            .collect();
        change.changed_attributes.sort();

        let force_new = change.changed_attributes.iter().any(|key| {
            handler
                .schema()
                .attribute(key)
                .is_some_and(|attr| attr.force_new)
        });

        change.action = if force_new {
            Action::Replace
        } else if change.changed_attributes.is_empty() {
            Action::NoOp
        } else {
            Action::Update
        };
        change.prior = Some(refreshed);

        Ok(change)
    }

    /// Refresh a recorded resource that is about to be deleted
    async fn plan_delete(&self, address: &str, state: ResourceState) -> Result<PlannedChange> {
        let handler = self.registry.resource(&state.resource_type)?;
        let mut d = ResourceData::from_state(handler.schema(), &state);

        let remote_absent = handler.read(&mut d).await? == ReadOutcome::Absent;
        if remote_absent {
            info!("{} is already gone remotely; dropping its state", address);
            self.emit_event(EngineEvent::RemoteAbsent {
                address: address.to_string(),
            });
        }

        Ok(PlannedChange {
            address: address.to_string(),
            resource_type: state.resource_type.clone(),
            action: Action::Delete,
            changed_attributes: Vec::new(),
            prior: Some(state),
            declared: Map::new(),
            remote_absent,
        })
    }

    /// Creates and updates by ascending apply rank, deletes by descending rank
    fn order_changes(&self, changes: &mut [PlannedChange]) {
        let rank = |change: &PlannedChange| -> i32 {
            let base = self
                .registry
                .resource(&change.resource_type)
                .map(|h| i32::from(h.apply_rank()))
                .unwrap_or(0);
            match change.action {
                Action::Delete => -1000 - base,
                _ => base,
            }
        };
        // Stable: manifest order is kept within a rank
        changes.sort_by_key(rank);
    }

    /// Plan and execute a pass
    pub async fn apply(&self, manifest: &Manifest) -> Result<ApplySummary> {
        self.emit_event(EngineEvent::PassStarted {
            resources_count: manifest.resources.len() + manifest.data.len(),
        });

        let plan = self.plan(manifest).await?;
        let mut summary = ApplySummary {
            failures: plan.failures.clone(),
            ..Default::default()
        };

        for change in &plan.changes {
            // Dry runs leave recorded state untouched too
            if self.dry_run {
                if change.action.is_mutating() {
                    info!(
                        "[DRY-RUN] Would {} {} {:?}",
                        change.action, change.address, change.changed_attributes
                    );
                    summary.skipped.push((change.address.clone(), change.action));
                }
                continue;
            }
            self.run_change(change, &mut summary).await;
        }

        self.finish(&summary).await?;
        Ok(summary)
    }

    /// Delete every recorded resource
    pub async fn destroy(&self) -> Result<ApplySummary> {
        let mut changes = Vec::new();
        let mut failures = Vec::new();
        let mut addresses = self.state_store.list_addresses().await?;
        addresses.sort();

        self.emit_event(EngineEvent::PassStarted {
            resources_count: addresses.len(),
        });

        for address in addresses {
            let Some(state) = self.state_store.get_state(&address).await? else {
                continue;
            };
            if address.starts_with(DATA_PREFIX) {
                if !self.dry_run {
                    self.state_store.delete_state(&address).await?;
                }
                continue;
            }
            match self.plan_delete(&address, state).await {
                Ok(change) => changes.push(change),
                Err(e) => {
                    error!("Failed to refresh {}: {}", address, e);
                    failures.push(ResourceFailure {
                        address,
                        action: Some(Action::Delete),
                        error: e.to_string(),
                    });
                }
            }
        }
        self.order_changes(&mut changes);

        let mut summary = ApplySummary {
            failures,
            ..Default::default()
        };
        for change in &changes {
            if self.dry_run {
                info!("[DRY-RUN] Would delete {}", change.address);
                summary.skipped.push((change.address.clone(), Action::Delete));
                continue;
            }
            self.run_change(change, &mut summary).await;
        }

        self.finish(&summary).await?;
        Ok(summary)
    }

    /// Adopt an existing remote entity under `<resource_type>.<name>`
    pub async fn import(
        &self,
        resource_type: &str,
        name: &str,
        id: &str,
    ) -> Result<ResourceState> {
        let handler = self.registry.resource(resource_type)?;
        let address = format!("{resource_type}.{name}");

        if self.state_store.get_state(&address).await?.is_some() {
            return Err(Error::invalid_input(format!(
                "{address} is already managed; remove it from state before importing"
            )));
        }

        let d = handler.import(id).await?;
        let state = d
            .into_state(resource_type)
            .ok_or_else(|| Error::Other(format!("Import of {address} produced no identity key")))?;

        self.state_store.set_state(&address, &state).await?;
        self.state_store.flush().await?;
        info!("Imported {} as {}", state.id, address);
        Ok(state)
    }

    async fn finish(&self, summary: &ApplySummary) -> Result<()> {
        self.state_store.flush().await?;
        self.emit_event(EngineEvent::PassFinished {
            applied: summary.applied.len(),
            failed: summary.failures.len(),
        });
        info!(
            "Pass finished: {} applied, {} skipped, {} failed",
            summary.applied.len(),
            summary.skipped.len(),
            summary.failures.len()
        );
        Ok(())
    }

    /// Run one step, recording the outcome; errors never escape
    async fn run_change(&self, change: &PlannedChange, summary: &mut ApplySummary) {
        if change.action.is_mutating() {
            self.emit_event(EngineEvent::ChangeStarted {
                address: change.address.clone(),
                action: change.action,
            });
        }

        match self.execute(change).await {
            Ok(()) => {
                if change.action.is_mutating() {
                    info!("{}: {} complete", change.address, change.action);
                    self.emit_event(EngineEvent::ChangeSucceeded {
                        address: change.address.clone(),
                        action: change.action,
                    });
                    summary.applied.push((change.address.clone(), change.action));
                }
            }
            Err(e) => {
                error!("{}: {} failed: {}", change.address, change.action, e);
                self.emit_event(EngineEvent::ChangeFailed {
                    address: change.address.clone(),
                    action: change.action,
                    error: e.to_string(),
                });
                summary.failures.push(ResourceFailure {
                    address: change.address.clone(),
                    action: Some(change.action),
                    error: e.to_string(),
                });
            }
        }
    }

    async fn execute(&self, change: &PlannedChange) -> Result<()> {
        match change.action {
            Action::Read => return self.read_data_source(change).await,
            Action::Delete => {
                let handler = self.registry.resource(&change.resource_type)?;
                return self.delete(change, handler.as_ref()).await;
            }
            _ => {}
        }

        let handler = self.registry.resource(&change.resource_type)?;
        let schema = handler.schema();

        let d = match (change.action, change.prior.as_ref()) {
            (Action::Update, Some(prior)) => {
                let mut d = ResourceData::for_update(schema, prior, &change.declared)?;
                handler.update(&mut d).await?;
                d
            }
            (Action::Replace, Some(_)) => {
                self.delete(change, handler.as_ref()).await?;
                let mut d = ResourceData::for_create(schema, &change.declared)?;
                handler.create(&mut d).await?;
                d
            }
            (Action::NoOp, Some(prior)) => ResourceData::from_state(schema, prior),
            _ => {
                // Create, including recreation after a refresh found nothing
                self.state_store.delete_state(&change.address).await?;
                let mut d = ResourceData::for_create(schema, &change.declared)?;
                handler.create(&mut d).await?;
                d
            }
        };

        let state = d.into_state(&change.resource_type).ok_or_else(|| {
            Error::Other(format!("{} has no identity key after {}", change.address, change.action))
        })?;
        self.state_store.set_state(&change.address, &state).await
    }

    async fn delete(&self, change: &PlannedChange, handler: &dyn ResourceHandler) -> Result<()> {
        let Some(prior) = change.prior.as_ref() else {
            warn!("{} has no recorded state to delete", change.address);
            return Ok(());
        };

        if change.remote_absent {
            debug!("{} needs no remote delete", change.address);
        } else {
            let mut d = ResourceData::from_state(handler.schema(), prior);
            handler.delete(&mut d).await?;
        }
        self.state_store.delete_state(&change.address).await
    }

    async fn read_data_source(&self, change: &PlannedChange) -> Result<()> {
        let handler = self.registry.data_source(&change.resource_type)?;
        let mut d = ResourceData::for_data_source(handler.schema());
        handler.read(&mut d).await?;

        let state = d.into_state(&change.resource_type).ok_or_else(|| {
            Error::Other(format!("{} returned no identity key", change.address))
        })?;
        debug!("Read {} ({})", change.address, state.id);
        self.state_store.set_state(&change.address, &state).await
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Dropped when full to keep memory bounded
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display_and_mutation() {
        assert_eq!(Action::NoOp.to_string(), "no-op");
        assert!(Action::Replace.is_mutating());
        assert!(!Action::Read.is_mutating());
    }

    #[test]
    fn test_empty_plan_has_no_mutations() {
        let plan = Plan::default();
        assert!(plan.is_empty());
        assert_eq!(plan.count(Action::Create), 0);
        assert_eq!(plan.action_for("forwardemail_domain.main"), None);
    }
}

// # Resource Handler Traits
//
// Lifecycle callbacks the apply engine invokes for each declared resource
// and data source. Handlers are constructed with the shared API client
// injected, so a callback only receives the attribute bag it works on.

use async_trait::async_trait;

use crate::resource_data::ResourceData;
use crate::schema::Schema;

/// Outcome of reading a resource from the remote
///
/// Together with `Err(_)` this gives the three read results the host needs:
/// found (state refreshed), absent (schedule recreation), and failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The entity exists; its attributes were written into the bag
    Found,
    /// The entity no longer exists remotely; the identity key was cleared
    Absent,
}

/// Lifecycle callbacks for a managed resource type
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Type name as used in manifests (e.g. `forwardemail_domain`)
    fn type_name(&self) -> &'static str;

    /// Declared attribute schema
    fn schema(&self) -> &'static Schema;

    /// Ordering within a pass: lower ranks are created first and deleted last
    fn apply_rank(&self) -> u8 {
        0
    }

    /// Create the remote entity from the declared attributes
    ///
    /// On success the bag holds the remote's view and an identity key.
    async fn create(&self, d: &mut ResourceData) -> Result<(), crate::Error>;

    /// Refresh the bag from the remote entity addressed by its identity key
    async fn read(&self, d: &mut ResourceData) -> Result<ReadOutcome, crate::Error>;

    /// Send the reconciled changes between prior and declared attributes
    async fn update(&self, d: &mut ResourceData) -> Result<(), crate::Error>;

    /// Delete the remote entity addressed by the identity key
    async fn delete(&self, d: &mut ResourceData) -> Result<(), crate::Error>;

    /// Adopt an existing remote entity by identity key
    ///
    /// The default reads the entity into a fresh bag.
    async fn import(&self, id: &str) -> Result<ResourceData, crate::Error> {
        let mut d = ResourceData::for_import(self.schema(), id);
        match self.read(&mut d).await? {
            ReadOutcome::Found => Ok(d),
            ReadOutcome::Absent => Err(crate::Error::invalid_input(format!(
                "Cannot import {} '{}': it does not exist",
                self.type_name(),
                id
            ))),
        }
    }
}

/// Read callback for a data source type
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    /// Type name as used in manifests (e.g. `forwardemail_account`)
    fn type_name(&self) -> &'static str;

    /// Computed attribute schema
    fn schema(&self) -> &'static Schema;

    /// Fill the bag from the remote and set its identity key
    async fn read(&self, d: &mut ResourceData) -> Result<(), crate::Error>;
}

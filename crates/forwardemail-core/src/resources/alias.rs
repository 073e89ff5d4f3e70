// # forwardemail_alias
//
// An alias on a domain. The remote addresses an alias by (domain, name),
// so the identity key encodes both as `domain/name`.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::reconcile;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, AttributeType, Schema};
use crate::traits::{ForwardEmailApi, ReadOutcome, ResourceHandler};
use crate::writer;

pub const TYPE_NAME: &str = "forwardemail_alias";

pub const DOMAIN: &str = "domain";
pub const NAME: &str = "name";
pub const ENABLED: &str = "enabled";
pub const RECIPIENT_VERIFICATION: &str = "recipient_verification";
pub const RECIPIENTS: &str = "recipients";
pub const LABELS: &str = "labels";
pub const DESCRIPTION: &str = "description";

static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("A resource to create Forward Email domain aliases.")
        .with_attribute(
            Attribute::required(DOMAIN, AttributeType::String)
                .with_force_new()
                .with_description("Fully qualified domain name (FQDN)."),
        )
        .with_attribute(
            Attribute::required(NAME, AttributeType::String)
                .with_force_new()
                .with_description("Alias name."),
        )
        .with_attribute(
            Attribute::optional(ENABLED, AttributeType::Bool)
                .with_default(true)
                .with_description("Whether to enable or disable this alias."),
        )
        .with_attribute(
            Attribute::optional(RECIPIENT_VERIFICATION, AttributeType::Bool)
                .with_default(false)
                .with_description(
                    "Whether to require recipients to click an email verification link for emails to flow through.",
                ),
        )
        .with_attribute(
            Attribute::optional(RECIPIENTS, AttributeType::StringList).with_description(
                "List of recipients as valid email addresses, fully-qualified domain names (FQDN), IP addresses, or webhook URLs.",
            ),
        )
        .with_attribute(
            Attribute::optional(LABELS, AttributeType::StringList)
                .with_description("List of labels."),
        )
        .with_attribute(
            Attribute::optional(DESCRIPTION, AttributeType::String)
                .with_description("Alias description."),
        )
});

pub fn schema() -> &'static Schema {
    &SCHEMA
}

/// Composite identity key of an alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasId {
    pub domain: String,
    pub name: String,
}

impl AliasId {
    pub fn new(domain: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }

    /// Identity of the instance a bag describes
    ///
    /// State recorded before the composite key existed carries only the
    /// alias name as its id; the domain is then taken from the attributes.
    pub fn resolve(d: &ResourceData) -> Result<Self> {
        let id = d.require_id()?;
        if id.contains('/') {
            return id.parse();
        }

        let domain = d.get_str(DOMAIN)?;
        if domain.is_empty() {
            return Err(Error::invalid_input(format!(
                "Alias id '{id}' has no domain; expected '<domain>/<name>'"
            )));
        }
        Ok(Self::new(domain, id))
    }
}

impl fmt::Display for AliasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.name)
    }
}

impl FromStr for AliasId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((domain, name)) if !domain.is_empty() && !name.is_empty() => {
                Ok(Self::new(domain, name))
            }
            _ => Err(Error::invalid_input(format!(
                "Invalid alias id '{s}'; expected '<domain>/<name>'"
            ))),
        }
    }
}

/// Lifecycle handler for `forwardemail_alias`
pub struct AliasResource {
    client: Arc<dyn ForwardEmailApi>,
}

impl AliasResource {
    pub fn new(client: Arc<dyn ForwardEmailApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for AliasResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &'static Schema {
        schema()
    }

    // Aliases live under a domain
    fn apply_rank(&self) -> u8 {
        1
    }

    async fn create(&self, d: &mut ResourceData) -> Result<()> {
        let id = AliasId::new(d.get_str(DOMAIN)?, d.get_str(NAME)?);
        let params = reconcile::alias_create_parameters(d)?;

        debug!("Creating alias {}", id);
        let alias = self.client.create_alias(&id.domain, &id.name, &params).await?;

        writer::write_alias(d, &alias)?;
        info!("Created alias {}", id);
        Ok(())
    }

    async fn read(&self, d: &mut ResourceData) -> Result<ReadOutcome> {
        let id = AliasId::resolve(d)?;

        match self.client.get_alias(&id.domain, &id.name).await {
            Ok(alias) => {
                writer::write_alias(d, &alias)?;
                Ok(ReadOutcome::Found)
            }
            Err(e) if e.is_not_found() => {
                warn!("Alias {} no longer exists remotely", id);
                d.clear_id();
                Ok(ReadOutcome::Absent)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(&self, d: &mut ResourceData) -> Result<()> {
        let id = AliasId::resolve(d)?;
        let params = reconcile::alias_update_parameters(d)?;

        debug!("Updating alias {} with {:?}", id, params);
        let alias = self.client.update_alias(&id.domain, &id.name, &params).await?;

        writer::write_alias(d, &alias)?;
        info!("Updated alias {}", id);
        Ok(())
    }

    async fn delete(&self, d: &mut ResourceData) -> Result<()> {
        let id = AliasId::resolve(d)?;

        self.client.delete_alias(&id.domain, &id.name).await?;

        d.clear_id();
        info!("Deleted alias {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ResourceState;
    use serde_json::json;

    #[test]
    fn test_alias_id_round_trips_through_display() {
        let id: AliasId = "example.com/sales".parse().unwrap();
        assert_eq!(id, AliasId::new("example.com", "sales"));
        assert_eq!(id.to_string(), "example.com/sales");
    }

    #[test]
    fn test_alias_id_rejects_malformed() {
        assert!("sales".parse::<AliasId>().is_err());
        assert!("/sales".parse::<AliasId>().is_err());
        assert!("example.com/".parse::<AliasId>().is_err());
    }

    #[test]
    fn test_resolve_accepts_bare_name_from_older_state() {
        let state = ResourceState::new(
            TYPE_NAME,
            "sales",
            json!({ "domain": "example.com", "name": "sales" })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let d = ResourceData::from_state(schema(), &state);

        assert_eq!(AliasId::resolve(&d).unwrap(), AliasId::new("example.com", "sales"));
    }
}

// # forwardemail_domain
//
// A domain registered with Forward Email. Addressed remotely by its fully
// qualified name, which is also the identity key.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::reconcile;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, AttributeType, Schema};
use crate::traits::{ForwardEmailApi, ReadOutcome, ResourceHandler};
use crate::writer;

pub const TYPE_NAME: &str = "forwardemail_domain";

pub const NAME: &str = "name";
pub const ADULT_CONTENT_PROTECTION: &str = "adult_content_protection";
pub const PHISHING_PROTECTION: &str = "phishing_protection";
pub const EXECUTABLE_PROTECTION: &str = "executable_protection";
pub const VIRUS_PROTECTION: &str = "virus_protection";
pub const RECIPIENT_VERIFICATION: &str = "recipient_verification";

static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("A resource to create Forward Email domains.")
        .with_attribute(
            Attribute::required(NAME, AttributeType::String)
                .with_force_new()
                .with_description("Fully qualified domain name (FQDN) or IP address."),
        )
        .with_attribute(
            Attribute::optional(ADULT_CONTENT_PROTECTION, AttributeType::Bool)
                .with_default(true)
                .with_description("Whether to enable Spam Scanner adult content protection on this domain."),
        )
        .with_attribute(
            Attribute::optional(PHISHING_PROTECTION, AttributeType::Bool)
                .with_default(true)
                .with_description("Whether to enable Spam Scanner phishing protection on this domain."),
        )
        .with_attribute(
            Attribute::optional(EXECUTABLE_PROTECTION, AttributeType::Bool)
                .with_default(true)
                .with_description("Whether to enable Spam Scanner executable protection on this domain."),
        )
        .with_attribute(
            Attribute::optional(VIRUS_PROTECTION, AttributeType::Bool)
                .with_default(true)
                .with_description("Whether to enable Spam Scanner virus protection on this domain."),
        )
        .with_attribute(
            Attribute::optional(RECIPIENT_VERIFICATION, AttributeType::Bool)
                .with_default(true)
                .with_description(
                    "Global domain default for whether to require alias recipients to click an email verification link for emails to flow through.",
                ),
        )
});

pub fn schema() -> &'static Schema {
    &SCHEMA
}

/// Lifecycle handler for `forwardemail_domain`
pub struct DomainResource {
    client: Arc<dyn ForwardEmailApi>,
}

impl DomainResource {
    pub fn new(client: Arc<dyn ForwardEmailApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for DomainResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &'static Schema {
        schema()
    }

    async fn create(&self, d: &mut ResourceData) -> Result<()> {
        let name = d.get_str(NAME)?;
        let params = reconcile::domain_create_parameters(d)?;

        debug!("Creating domain {}", name);
        let domain = self.client.create_domain(&name, &params).await?;

        writer::write_domain(d, &domain)?;
        info!("Created domain {}", name);
        Ok(())
    }

    async fn read(&self, d: &mut ResourceData) -> Result<ReadOutcome> {
        let name = d.require_id()?.to_string();

        match self.client.get_domain(&name).await {
            Ok(domain) => {
                writer::write_domain(d, &domain)?;
                Ok(ReadOutcome::Found)
            }
            Err(e) if e.is_not_found() => {
                warn!("Domain {} no longer exists remotely", name);
                d.clear_id();
                Ok(ReadOutcome::Absent)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(&self, d: &mut ResourceData) -> Result<()> {
        let name = d.require_id()?.to_string();
        let params = reconcile::domain_update_parameters(d)?;

        if params.is_empty() {
            debug!("Domain {} has no changed attributes, skipping update", name);
            return Ok(());
        }

        debug!("Updating domain {} with {:?}", name, params);
        let domain = self.client.update_domain(&name, &params).await?;

        writer::write_domain(d, &domain)?;
        info!("Updated domain {}", name);
        Ok(())
    }

    async fn delete(&self, d: &mut ResourceData) -> Result<()> {
        let name = d.require_id()?.to_string();

        self.client.delete_domain(&name).await?;

        d.clear_id();
        info!("Deleted domain {}", name);
        Ok(())
    }
}

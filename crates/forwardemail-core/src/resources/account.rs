// # forwardemail_account
//
// Read-only data source for the account that owns the API key. Always
// sourced from the remote; there is nothing to create or delete.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, AttributeType, Schema};
use crate::traits::{DataSourceHandler, ForwardEmailApi};
use crate::writer;

pub const TYPE_NAME: &str = "forwardemail_account";

pub const PLAN: &str = "plan";
pub const EMAIL: &str = "email";
pub const FULL_EMAIL: &str = "full_email";
pub const DISPLAY_NAME: &str = "display_name";

static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("A data source to get current account properties.")
        .with_attribute(Attribute::computed(PLAN, AttributeType::String).with_description("Plan type."))
        .with_attribute(Attribute::computed(EMAIL, AttributeType::String).with_description("Email address."))
        .with_attribute(
            Attribute::computed(FULL_EMAIL, AttributeType::String).with_description("Full email address."),
        )
        .with_attribute(
            Attribute::computed(DISPLAY_NAME, AttributeType::String).with_description("Display name."),
        )
});

pub fn schema() -> &'static Schema {
    &SCHEMA
}

/// Read handler for `forwardemail_account`
pub struct AccountDataSource {
    client: Arc<dyn ForwardEmailApi>,
}

impl AccountDataSource {
    pub fn new(client: Arc<dyn ForwardEmailApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceHandler for AccountDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &'static Schema {
        schema()
    }

    async fn read(&self, d: &mut ResourceData) -> Result<()> {
        let account = self.client.get_account().await?;
        debug!("Read account {}", account.id);
        writer::write_account(d, &account)
    }
}

// # Forward Email API Trait
//
// Defines the interface to the remote Forward Email REST API and the
// entities it exchanges.
//
// ## Implementations
//
// - HTTP: `forwardemail-client` crate
// - Tests: in-memory doubles under `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use forwardemail_core::traits::{ForwardEmailApi, DomainParameters};
//
// async fn disable_virus_scan(api: &dyn ForwardEmailApi) -> forwardemail_core::Result<()> {
//     let params = DomainParameters {
//         has_virus_protection: Some(false),
//         ..Default::default()
//     };
//     api.update_domain("example.com", &params).await?;
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Account owning the API key
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    /// Remote account identifier
    pub id: String,
    /// Plan tier ("free", "enhanced_protection", "team")
    #[serde(default)]
    pub plan: String,
    /// Login email address
    #[serde(default)]
    pub email: String,
    /// Email address including display name
    #[serde(default)]
    pub full_email: String,
    /// Display name
    #[serde(default)]
    pub display_name: String,
}

/// A domain registered with Forward Email
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Domain {
    /// Remote identifier
    #[serde(default)]
    pub id: String,
    /// Fully qualified domain name
    pub name: String,
    #[serde(default)]
    pub has_adult_content_protection: bool,
    #[serde(default)]
    pub has_phishing_protection: bool,
    #[serde(default)]
    pub has_executable_protection: bool,
    #[serde(default)]
    pub has_virus_protection: bool,
    #[serde(default)]
    pub has_recipient_verification: bool,
}

/// Reference from an alias to its owning domain
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainRef {
    /// Domain name
    pub name: String,
}

/// An alias on a domain
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Alias {
    /// Remote identifier
    #[serde(default)]
    pub id: String,
    /// Alias name (the local part)
    pub name: String,
    /// Owning domain
    pub domain: DomainRef,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub has_recipient_verification: bool,
    /// Forwarding targets, in declared order
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Labels, in declared order
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Parameters for creating or updating a domain
///
/// Every field is optional. `None` means "leave unchanged" and is never
/// serialized, so an update payload carries only what was reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_adult_content_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_phishing_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_executable_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_virus_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_recipient_verification: Option<bool>,
}

impl DomainParameters {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parameters for creating or updating an alias
///
/// Same sparseness rules as [`DomainParameters`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AliasParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_recipient_verification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Trait for the remote Forward Email API
///
/// One method per remote operation. Implementations translate transport
/// and HTTP failures into [`crate::Error::Remote`] and nothing else: no
/// retries, no backoff, no caching.
///
/// # Thread Safety
///
/// A single client handle is constructed per session and shared by every
/// resource handler, so implementations must be `Send + Sync` and hold no
/// per-call mutable state.
#[async_trait]
pub trait ForwardEmailApi: Send + Sync {
    /// Get the account that owns the API key
    async fn get_account(&self) -> Result<Account, crate::Error>;

    /// Create a domain
    async fn create_domain(
        &self,
        name: &str,
        params: &DomainParameters,
    ) -> Result<Domain, crate::Error>;

    /// Get a domain by name
    async fn get_domain(&self, name: &str) -> Result<Domain, crate::Error>;

    /// Update a domain; only the set fields of `params` are sent
    async fn update_domain(
        &self,
        name: &str,
        params: &DomainParameters,
    ) -> Result<Domain, crate::Error>;

    /// Delete a domain
    async fn delete_domain(&self, name: &str) -> Result<(), crate::Error>;

    /// Create an alias on a domain
    async fn create_alias(
        &self,
        domain: &str,
        name: &str,
        params: &AliasParameters,
    ) -> Result<Alias, crate::Error>;

    /// Get an alias
    async fn get_alias(&self, domain: &str, name: &str) -> Result<Alias, crate::Error>;

    /// Update an alias; only the set fields of `params` are sent
    async fn update_alias(
        &self,
        domain: &str,
        name: &str,
        params: &AliasParameters,
    ) -> Result<Alias, crate::Error>;

    /// Delete an alias
    async fn delete_alias(&self, domain: &str, name: &str) -> Result<(), crate::Error>;
}

/// Helper trait for constructing API clients from configuration
pub trait ApiClientFactory: Send + Sync {
    /// Create a shared client handle
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<std::sync::Arc<dyn ForwardEmailApi>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_domain_parameters_skip_unset_fields() {
        let params = DomainParameters {
            has_virus_protection: Some(false),
            ..Default::default()
        };

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({ "has_virus_protection": false }));
    }

    #[test]
    fn test_alias_parses_nested_domain() {
        let alias: Alias = serde_json::from_value(serde_json::json!({
            "id": "64f0c9",
            "name": "sales",
            "domain": { "name": "example.com", "id": "abc" },
            "is_enabled": true,
            "recipients": ["a@x.com"],
        }))
        .unwrap();

        assert_eq!(alias.domain.name, "example.com");
        assert!(alias.labels.is_empty());
        assert!(!alias.has_recipient_verification);
    }
}

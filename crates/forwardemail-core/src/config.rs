//! Configuration types for the Forward Email provider
//!
//! - [`ProviderConfig`]: credentials and transport settings for the API client
//! - [`Manifest`]: the declared resources and data sources for a pass
//! - [`EngineConfig`]: apply engine settings

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};

/// Environment variable the API key is sourced from
pub const API_KEY_ENV: &str = "FORWARDEMAIL_API_KEY";

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "FORWARDEMAIL_API_URL";

/// Default Forward Email API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.forwardemail.net";

/// Provider-level configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for Forward Email management
    /// ⚠️ NEVER log this value
    pub api_key: String,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a configuration with the default endpoint and timeout
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Reads [`API_KEY_ENV`] (required) and [`API_URL_ENV`] (optional).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::config(format!("{API_KEY_ENV} is not set")))?;

        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.base_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::config("api_key cannot be empty"));
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(Error::config(format!(
                "base_url must use HTTP or HTTPS scheme. Got: {}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be > 0"));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// A declared resource block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type (e.g. `forwardemail_alias`)
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Local name, unique per type
    pub name: String,

    /// Declared attribute values
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ResourceConfig {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        attributes: Map<String, Value>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            attributes,
        }
    }

    /// State address: `<type>.<name>`
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

/// A declared data source block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    #[serde(rename = "type")]
    pub data_type: String,

    pub name: String,
}

impl DataSourceConfig {
    pub fn new(data_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            name: name.into(),
        }
    }

    /// State address: `data.<type>.<name>`
    pub fn address(&self) -> String {
        format!("data.{}.{}", self.data_type, self.name)
    }
}

/// Declared desired state for one pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,

    #[serde(default)]
    pub data: Vec<DataSourceConfig>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource: ResourceConfig) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_data_source(mut self, data: DataSourceConfig) -> Self {
        self.data.push(data);
        self
    }

    /// Load a manifest from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config(format!("Failed to read manifest {}: {}", path.display(), e))
        })?;
        let manifest: Manifest = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!("Failed to parse manifest {}: {}", path.display(), e))
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate structural rules: non-empty names, unique addresses
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        let addresses = self
            .resources
            .iter()
            .map(|r| (r.name.as_str(), r.address()))
            .chain(self.data.iter().map(|d| (d.name.as_str(), d.address())));

        for (name, address) in addresses {
            if name.is_empty() || name.contains('.') {
                return Err(Error::config(format!(
                    "Invalid local name in '{address}': names must be non-empty and contain no '.'"
                )));
            }
            if !seen.insert(address.clone()) {
                return Err(Error::config(format!("Duplicate declaration of '{address}'")));
            }
        }

        Ok(())
    }
}

/// Apply engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Plan and log, but never call mutating operations
    #[serde(default)]
    pub dry_run: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let config = ProviderConfig::new("secret_key_12345");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[test]
    fn test_provider_config_validation() {
        assert!(ProviderConfig::new("key").validate().is_ok());
        assert!(ProviderConfig::new("  ").validate().is_err());
        assert!(ProviderConfig::new("key").with_base_url("ftp://x").validate().is_err());
        assert!(ProviderConfig::new("key").with_timeout_secs(0).validate().is_err());
    }

    #[test]
    fn test_manifest_parses_and_addresses() {
        let manifest: Manifest = serde_json::from_value(json!({
            "resources": [
                { "type": "forwardemail_domain", "name": "main",
                  "attributes": { "name": "example.com" } }
            ],
            "data": [ { "type": "forwardemail_account", "name": "me" } ]
        }))
        .unwrap();

        assert!(manifest.validate().is_ok());
        assert_eq!(manifest.resources[0].address(), "forwardemail_domain.main");
        assert_eq!(manifest.data[0].address(), "data.forwardemail_account.me");
    }

    #[test]
    fn test_manifest_rejects_duplicates() {
        let manifest = Manifest::new()
            .with_resource(ResourceConfig::new("forwardemail_domain", "main", Map::new()))
            .with_resource(ResourceConfig::new("forwardemail_domain", "main", Map::new()));

        assert!(manifest.validate().is_err());
    }
}

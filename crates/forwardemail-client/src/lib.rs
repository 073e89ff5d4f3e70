// # Forward Email API Client
//
// This crate provides the HTTP implementation of `ForwardEmailApi` on top
// of the Forward Email REST API.
//
// ## Behavior
//
// - One HTTP request per trait call
// - HTTP timeout configured (30 seconds by default)
// - Every non-2xx status is mapped to `Error::Remote` with the status kept,
//   so callers can tell "not found" apart from everything else
// - Transport and decoding failures map to `Error::Remote` without a status
// - NO retry, backoff or rate limiting; a failed call fails the step
// - NO caching; every read goes to the remote
//
// ## Security Requirements
//
// - API key NEVER appears in logs or `Debug` output
// - Client construction fails fast if the key is empty
//
// ## API Reference
//
// - Authentication: HTTP basic auth, API key as username, empty password
// - Account: GET `/v1/account`
// - Domains: POST `/v1/domains`, GET/PUT/DELETE `/v1/domains/:domain`
// - Aliases: POST `/v1/domains/:domain/aliases`,
//   GET/PUT/DELETE `/v1/domains/:domain/aliases/:alias`

use async_trait::async_trait;
use forwardemail_core::config::ProviderConfig;
use forwardemail_core::traits::{
    Account, Alias, AliasParameters, ApiClientFactory, Domain, DomainParameters, ForwardEmailApi,
};
use forwardemail_core::{Error, ResourceRegistry, Result, forwardemail_registry};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// API version prefix of every path
const API_VERSION: &str = "v1";

/// Forward Email API client
///
/// A single client is built per session and shared by every handler; the
/// underlying `reqwest::Client` pools connections internally.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct ForwardEmailClient {
    /// API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API base URL (no trailing path)
    base_url: Url,

    /// HTTP client for API requests
    http: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for ForwardEmailClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardEmailClient")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

/// Request body for creating a domain
#[derive(Serialize)]
struct CreateDomainBody<'a> {
    domain: &'a str,
    #[serde(flatten)]
    params: &'a DomainParameters,
}

/// Request body for creating an alias
#[derive(Serialize)]
struct CreateAliasBody<'a> {
    name: &'a str,
    #[serde(flatten)]
    params: &'a AliasParameters,
}

impl ForwardEmailClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the configuration does not validate, the base
    ///   URL does not parse, or the HTTP client cannot be built
    ///
    /// # Security
    ///
    /// The API key will NEVER be logged or displayed in error messages.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("Invalid base_url '{}': {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Invalid base_url '{}': not a base URL",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("forwardemail-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url,
            http,
        })
    }

    /// Build an endpoint URL from path segments
    ///
    /// Segments are percent-encoded, so alias names such as `*` or
    /// `a+b` address the right entity.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("base_url cannot carry a path"))?
            .pop_if_empty()
            .push(API_VERSION)
            .extend(segments);
        Ok(url)
    }

    /// Send one request and return the successful response
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(segments)?;
        tracing::debug!("{} {}", method, url.path());

        let mut request = self
            .http
            .request(method.clone(), url)
            .basic_auth(&self.api_key, Some(""))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        let err = remote_error(status, &body);
        tracing::debug!("{} {} failed: {}", method, segments.join("/"), err);
        Err(err)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> Result<T> {
        self.send(method, segments, body)
            .await?
            .json::<T>()
            .await
            .map_err(|e| Error::transport(format!("Failed to parse response: {}", e.without_url())))
    }
}

/// Map a non-success response to a remote error
///
/// Forward Email reports failures as `{"message": "..."}`; anything else
/// is passed through as text.
fn remote_error(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            let text = body.trim();
            if text.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                text.to_string()
            }
        });

    let message = match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: invalid API key or insufficient permissions ({detail})"
        ),
        404 => format!("Not found: {detail}"),
        429 => format!("Rate limit exceeded: {detail}"),
        500..=599 => format!("Forward Email server error: {detail}"),
        _ => detail,
    };

    Error::remote(status.as_u16(), message)
}

#[async_trait]
impl ForwardEmailApi for ForwardEmailClient {
    async fn get_account(&self) -> Result<Account> {
        self.request_json(Method::GET, &["account"], None).await
    }

    async fn create_domain(&self, name: &str, params: &DomainParameters) -> Result<Domain> {
        let body = serde_json::to_value(CreateDomainBody { domain: name, params })?;
        self.request_json(Method::POST, &["domains"], Some(body)).await
    }

    async fn get_domain(&self, name: &str) -> Result<Domain> {
        self.request_json(Method::GET, &["domains", name], None).await
    }

    async fn update_domain(&self, name: &str, params: &DomainParameters) -> Result<Domain> {
        let body = serde_json::to_value(params)?;
        self.request_json(Method::PUT, &["domains", name], Some(body))
            .await
    }

    async fn delete_domain(&self, name: &str) -> Result<()> {
        self.send(Method::DELETE, &["domains", name], None).await?;
        Ok(())
    }

    async fn create_alias(
        &self,
        domain: &str,
        name: &str,
        params: &AliasParameters,
    ) -> Result<Alias> {
        let body = serde_json::to_value(CreateAliasBody { name, params })?;
        self.request_json(Method::POST, &["domains", domain, "aliases"], Some(body))
            .await
    }

    async fn get_alias(&self, domain: &str, name: &str) -> Result<Alias> {
        self.request_json(Method::GET, &["domains", domain, "aliases", name], None)
            .await
    }

    async fn update_alias(
        &self,
        domain: &str,
        name: &str,
        params: &AliasParameters,
    ) -> Result<Alias> {
        let body = serde_json::to_value(params)?;
        self.request_json(
            Method::PUT,
            &["domains", domain, "aliases", name],
            Some(body),
        )
        .await
    }

    async fn delete_alias(&self, domain: &str, name: &str) -> Result<()> {
        self.send(Method::DELETE, &["domains", domain, "aliases", name], None)
            .await?;
        Ok(())
    }
}

/// Factory for creating Forward Email clients
pub struct ForwardEmailClientFactory;

impl ApiClientFactory for ForwardEmailClientFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn ForwardEmailApi>> {
        if config.api_key.is_empty() {
            return Err(Error::config(
                "Forward Email API key is required (set FORWARDEMAIL_API_KEY)",
            ));
        }
        Ok(Arc::new(ForwardEmailClient::new(config)?))
    }
}

/// Build the resource registry backed by one shared HTTP client
///
/// # Example
///
/// ```rust,no_run
/// use forwardemail_core::ProviderConfig;
///
/// let config = ProviderConfig::new("api-key");
/// let registry = forwardemail_client::registry(&config).unwrap();
/// assert!(registry.has_resource("forwardemail_alias"));
/// ```
pub fn registry(config: &ProviderConfig) -> Result<ResourceRegistry> {
    let client = ForwardEmailClientFactory.create(config)?;
    tracing::debug!("Forward Email client configured for {}", config.base_url);
    Ok(forwardemail_registry(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ForwardEmailClient {
        ForwardEmailClient::new(&ProviderConfig::new("test_key")).unwrap()
    }

    #[test]
    fn test_factory_creation() {
        let config = ProviderConfig::new("test_key");
        assert!(ForwardEmailClientFactory.create(&config).is_ok());
    }

    #[test]
    fn test_factory_missing_key() {
        let config = ProviderConfig::new("");
        let err = ForwardEmailClientFactory.create(&config).err().expect("expected config error");
        assert!(err.is_config());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = ProviderConfig::new("key").with_base_url("http://");
        assert!(ForwardEmailClient::new(&config).is_err());
    }

    #[test]
    fn test_api_key_not_exposed_in_debug() {
        let client =
            ForwardEmailClient::new(&ProviderConfig::new("secret_key_12345")).unwrap();

        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("ForwardEmailClient"));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let url = client()
            .endpoint(&["domains", "example.com", "aliases", "a b"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.forwardemail.net/v1/domains/example.com/aliases/a%20b"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = ProviderConfig::new("key").with_base_url("http://localhost:8080/proxy/");
        let client = ForwardEmailClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(&["account"]).unwrap().as_str(),
            "http://localhost:8080/proxy/v1/account"
        );
    }

    #[test]
    fn test_remote_error_uses_message_field() {
        let err = remote_error(StatusCode::NOT_FOUND, r#"{"message":"Alias does not exist"}"#);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Alias does not exist"));
    }

    #[test]
    fn test_remote_error_falls_back_to_reason() {
        let err = remote_error(StatusCode::BAD_GATEWAY, "");
        assert!(matches!(err, Error::Remote { status: Some(502), .. }));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_create_domain_body_is_flat() {
        let params = DomainParameters {
            has_virus_protection: Some(false),
            ..Default::default()
        };
        let body = serde_json::to_value(CreateDomainBody {
            domain: "example.com",
            params: &params,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "domain": "example.com", "has_virus_protection": false })
        );
    }
}

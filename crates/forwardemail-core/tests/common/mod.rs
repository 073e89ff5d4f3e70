//! Test doubles and common utilities for contract tests
//!
//! `MockForwardEmailApi` keeps domains and aliases in memory and answers
//! like the remote does: 404 for missing entities, sparse updates that only
//! touch the fields they carry. Every call is recorded so tests can assert
//! exactly what went over the wire.

#![allow(dead_code)]

use async_trait::async_trait;
use forwardemail_core::error::{Error, Result};
use forwardemail_core::traits::{
    Account, Alias, AliasParameters, Domain, DomainParameters, DomainRef, ForwardEmailApi,
};
use forwardemail_core::{EngineConfig, Manifest, ResourceConfig};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// A recorded API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetAccount,
    CreateDomain(String),
    GetDomain(String),
    UpdateDomain(String, DomainParameters),
    DeleteDomain(String),
    CreateAlias(String, String),
    GetAlias(String, String),
    UpdateAlias(String, String, AliasParameters),
    DeleteAlias(String, String),
}

impl Call {
    /// Whether the call changes remote state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::GetAccount | Call::GetDomain(_) | Call::GetAlias(..))
    }
}

#[derive(Default)]
struct Remote {
    domains: BTreeMap<String, Domain>,
    aliases: BTreeMap<(String, String), Alias>,
    calls: Vec<Call>,
    failing_domains: HashSet<String>,
    next_id: usize,
}

impl Remote {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("id-{:04}", self.next_id)
    }
}

/// In-memory Forward Email API
#[derive(Clone, Default)]
pub struct MockForwardEmailApi {
    inner: Arc<Mutex<Remote>>,
}

impl MockForwardEmailApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle for injecting into handlers
    pub fn handle(&self) -> Arc<dyn ForwardEmailApi> {
        Arc::new(self.clone())
    }

    /// Every call under `domain` fails with a 500 from now on
    pub fn fail_domain(&self, domain: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_domains
            .insert(domain.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub fn domain(&self, name: &str) -> Option<Domain> {
        self.inner.lock().unwrap().domains.get(name).cloned()
    }

    pub fn alias(&self, domain: &str, name: &str) -> Option<Alias> {
        self.inner
            .lock()
            .unwrap()
            .aliases
            .get(&(domain.to_string(), name.to_string()))
            .cloned()
    }

    /// Remove a domain behind the provider's back
    pub fn remove_domain_out_of_band(&self, name: &str) {
        let mut remote = self.inner.lock().unwrap();
        remote.domains.remove(name);
        remote.aliases.retain(|(domain, _), _| domain != name);
    }

    /// Flip a domain toggle behind the provider's back
    pub fn set_virus_protection_out_of_band(&self, name: &str, value: bool) {
        if let Some(domain) = self.inner.lock().unwrap().domains.get_mut(name) {
            domain.has_virus_protection = value;
        }
    }

    pub fn last_domain_update(&self) -> Option<DomainParameters> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::UpdateDomain(_, params) => Some(params),
            _ => None,
        })
    }

    pub fn last_alias_update(&self) -> Option<AliasParameters> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::UpdateAlias(_, _, params) => Some(params),
            _ => None,
        })
    }

    fn record(&self, call: Call, domain: Option<&str>) -> Result<std::sync::MutexGuard<'_, Remote>> {
        let mut remote = self.inner.lock().unwrap();
        remote.calls.push(call);
        if let Some(domain) = domain
            && remote.failing_domains.contains(domain)
        {
            return Err(Error::remote(500, "Internal Server Error"));
        }
        Ok(remote)
    }
}

fn not_found(what: &str) -> Error {
    Error::remote(404, format!("{what} does not exist"))
}

#[async_trait]
impl ForwardEmailApi for MockForwardEmailApi {
    async fn get_account(&self) -> Result<Account> {
        let _remote = self.record(Call::GetAccount, None)?;
        Ok(Account {
            id: "acct-1".to_string(),
            plan: "enhanced_protection".to_string(),
            email: "owner@example.com".to_string(),
            full_email: "Owner <owner@example.com>".to_string(),
            display_name: "Owner".to_string(),
        })
    }

    async fn create_domain(&self, name: &str, params: &DomainParameters) -> Result<Domain> {
        let mut remote = self.record(Call::CreateDomain(name.to_string()), Some(name))?;
        // Names are stored lowercased, like the real service
        let name = name.to_ascii_lowercase();
        if remote.domains.contains_key(&name) {
            return Err(Error::remote(400, "Domain already exists"));
        }
        let domain = Domain {
            id: remote.next_id(),
            name: name.clone(),
            has_adult_content_protection: params.has_adult_content_protection.unwrap_or(true),
            has_phishing_protection: params.has_phishing_protection.unwrap_or(true),
            has_executable_protection: params.has_executable_protection.unwrap_or(true),
            has_virus_protection: params.has_virus_protection.unwrap_or(true),
            has_recipient_verification: params.has_recipient_verification.unwrap_or(false),
        };
        remote.domains.insert(name, domain.clone());
        Ok(domain)
    }

    async fn get_domain(&self, name: &str) -> Result<Domain> {
        let remote = self.record(Call::GetDomain(name.to_string()), Some(name))?;
        remote.domains.get(name).cloned().ok_or_else(|| not_found("Domain"))
    }

    async fn update_domain(&self, name: &str, params: &DomainParameters) -> Result<Domain> {
        let mut remote =
            self.record(Call::UpdateDomain(name.to_string(), params.clone()), Some(name))?;
        let domain = remote.domains.get_mut(name).ok_or_else(|| not_found("Domain"))?;
        if let Some(v) = params.has_adult_content_protection {
            domain.has_adult_content_protection = v;
        }
        if let Some(v) = params.has_phishing_protection {
            domain.has_phishing_protection = v;
        }
        if let Some(v) = params.has_executable_protection {
            domain.has_executable_protection = v;
        }
        if let Some(v) = params.has_virus_protection {
            domain.has_virus_protection = v;
        }
        if let Some(v) = params.has_recipient_verification {
            domain.has_recipient_verification = v;
        }
        Ok(domain.clone())
    }

    async fn delete_domain(&self, name: &str) -> Result<()> {
        let mut remote = self.record(Call::DeleteDomain(name.to_string()), Some(name))?;
        remote.domains.remove(name).ok_or_else(|| not_found("Domain"))?;
        remote.aliases.retain(|(domain, _), _| domain != name);
        Ok(())
    }

    async fn create_alias(
        &self,
        domain: &str,
        name: &str,
        params: &AliasParameters,
    ) -> Result<Alias> {
        let mut remote = self.record(
            Call::CreateAlias(domain.to_string(), name.to_string()),
            Some(domain),
        )?;
        if !remote.domains.contains_key(domain) {
            return Err(not_found("Domain"));
        }
        let key = (domain.to_string(), name.to_string());
        if remote.aliases.contains_key(&key) {
            return Err(Error::remote(400, "Alias already exists"));
        }
        let alias = Alias {
            id: remote.next_id(),
            name: name.to_string(),
            domain: DomainRef {
                name: domain.to_string(),
            },
            is_enabled: params.is_enabled.unwrap_or(true),
            has_recipient_verification: params.has_recipient_verification.unwrap_or(false),
            recipients: params.recipients.clone().unwrap_or_default(),
            labels: params.labels.clone().unwrap_or_default(),
            description: params.description.clone().unwrap_or_default(),
        };
        remote.aliases.insert(key, alias.clone());
        Ok(alias)
    }

    async fn get_alias(&self, domain: &str, name: &str) -> Result<Alias> {
        let remote = self.record(
            Call::GetAlias(domain.to_string(), name.to_string()),
            Some(domain),
        )?;
        remote
            .aliases
            .get(&(domain.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("Alias"))
    }

    async fn update_alias(
        &self,
        domain: &str,
        name: &str,
        params: &AliasParameters,
    ) -> Result<Alias> {
        let mut remote = self.record(
            Call::UpdateAlias(domain.to_string(), name.to_string(), params.clone()),
            Some(domain),
        )?;
        let alias = remote
            .aliases
            .get_mut(&(domain.to_string(), name.to_string()))
            .ok_or_else(|| not_found("Alias"))?;
        // Omitted flags and lists are reset remotely
        alias.is_enabled = params.is_enabled.unwrap_or(true);
        alias.has_recipient_verification = params.has_recipient_verification.unwrap_or(false);
        alias.recipients = params.recipients.clone().unwrap_or_default();
        alias.labels = params.labels.clone().unwrap_or_default();
        if let Some(v) = &params.description {
            alias.description = v.clone();
        }
        Ok(alias.clone())
    }

    async fn delete_alias(&self, domain: &str, name: &str) -> Result<()> {
        let mut remote = self.record(
            Call::DeleteAlias(domain.to_string(), name.to_string()),
            Some(domain),
        )?;
        remote
            .aliases
            .remove(&(domain.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| not_found("Alias"))
    }
}

/// Object literal to attribute map
pub fn attrs(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("attributes must be a JSON object")
}

pub fn domain_block(local: &str, attributes: Value) -> ResourceConfig {
    ResourceConfig::new("forwardemail_domain", local, attrs(attributes))
}

pub fn alias_block(local: &str, attributes: Value) -> ResourceConfig {
    ResourceConfig::new("forwardemail_alias", local, attrs(attributes))
}

/// One domain with one alias
pub fn basic_manifest() -> Manifest {
    Manifest::new()
        .with_resource(domain_block("main", json!({ "name": "example.com" })))
        .with_resource(alias_block(
            "sales",
            json!({
                "domain": "example.com",
                "name": "sales",
                "recipients": ["a@x.com", "b@x.com"],
            }),
        ))
}

/// Engine config with a roomy event channel
pub fn test_engine_config() -> EngineConfig {
    EngineConfig::default()
}

//! Change reconciler
//!
//! Decides which declared attributes go into an update payload. The
//! payloads are sparse: a field that should not be sent is `None`, which
//! is distinct from "set to false" or "set to empty".
//!
//! Domain toggles are diffed against the prior recorded value. Alias lists
//! and flags are compared against an empty baseline instead, so they are
//! sent on every update: Forward Email resets alias fields that are omitted
//! from a partial update. Only the alias description is diffed.

use serde_json::Value;

use crate::error::Result;
use crate::resource_data::ResourceData;
use crate::resources::{alias, domain};
use crate::traits::{AliasParameters, DomainParameters};

/// Value to send for a scalar, or `None` when it equals the prior value
pub fn to_change<T: PartialEq>(prior: Option<T>, current: T) -> Option<T> {
    match prior {
        Some(prior) if prior == current => None,
        _ => Some(current),
    }
}

/// Value to send for a list: always the current list
pub fn to_list_change(current: Vec<String>) -> Option<Vec<String>> {
    to_change(None, current)
}

fn bool_change(d: &ResourceData, key: &str) -> Result<Option<bool>> {
    let current = d.get_bool(key)?;
    let prior = d.get_prior(key).as_ref().and_then(Value::as_bool);
    Ok(to_change(prior, current))
}

fn string_change(d: &ResourceData, key: &str) -> Result<Option<String>> {
    let current = d.get_str(key)?;
    let prior = d
        .get_prior(key)
        .and_then(|v| v.as_str().map(str::to_string));
    Ok(to_change(prior, current))
}

fn bool_resend(d: &ResourceData, key: &str) -> Result<Option<bool>> {
    Ok(to_change(None, d.get_bool(key)?))
}

fn list_change(d: &ResourceData, key: &str) -> Result<Option<Vec<String>>> {
    Ok(to_list_change(d.get_list(key)?))
}

/// Full parameter set for creating a domain
pub fn domain_create_parameters(d: &ResourceData) -> Result<DomainParameters> {
    Ok(DomainParameters {
        has_adult_content_protection: Some(d.get_bool(domain::ADULT_CONTENT_PROTECTION)?),
        has_phishing_protection: Some(d.get_bool(domain::PHISHING_PROTECTION)?),
        has_executable_protection: Some(d.get_bool(domain::EXECUTABLE_PROTECTION)?),
        has_virus_protection: Some(d.get_bool(domain::VIRUS_PROTECTION)?),
        has_recipient_verification: Some(d.get_bool(domain::RECIPIENT_VERIFICATION)?),
    })
}

/// Reconciled parameter set for updating a domain
pub fn domain_update_parameters(d: &ResourceData) -> Result<DomainParameters> {
    Ok(DomainParameters {
        has_adult_content_protection: bool_change(d, domain::ADULT_CONTENT_PROTECTION)?,
        has_phishing_protection: bool_change(d, domain::PHISHING_PROTECTION)?,
        has_executable_protection: bool_change(d, domain::EXECUTABLE_PROTECTION)?,
        has_virus_protection: bool_change(d, domain::VIRUS_PROTECTION)?,
        has_recipient_verification: bool_change(d, domain::RECIPIENT_VERIFICATION)?,
    })
}

/// Full parameter set for creating an alias
pub fn alias_create_parameters(d: &ResourceData) -> Result<AliasParameters> {
    Ok(AliasParameters {
        is_enabled: Some(d.get_bool(alias::ENABLED)?),
        has_recipient_verification: Some(d.get_bool(alias::RECIPIENT_VERIFICATION)?),
        recipients: list_change(d, alias::RECIPIENTS)?,
        labels: list_change(d, alias::LABELS)?,
        description: Some(d.get_str(alias::DESCRIPTION)?),
    })
}

/// Reconciled parameter set for updating an alias
pub fn alias_update_parameters(d: &ResourceData) -> Result<AliasParameters> {
    Ok(AliasParameters {
        is_enabled: bool_resend(d, alias::ENABLED)?,
        has_recipient_verification: bool_resend(d, alias::RECIPIENT_VERIFICATION)?,
        recipients: list_change(d, alias::RECIPIENTS)?,
        labels: list_change(d, alias::LABELS)?,
        description: string_change(d, alias::DESCRIPTION)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_change_omits_equal_values() {
        assert_eq!(to_change(Some(true), true), None);
        assert_eq!(to_change(Some(true), false), Some(false));
        assert_eq!(to_change(None, false), Some(false));
        assert_eq!(to_change(Some("a".to_string()), "a".to_string()), None);
    }

    #[test]
    fn test_to_list_change_never_omits() {
        assert_eq!(to_list_change(vec![]), Some(vec![]));
        assert_eq!(
            to_list_change(vec!["a@x.com".to_string()]),
            Some(vec!["a@x.com".to_string()])
        );
    }

    #[test]
    fn test_to_change_is_structural() {
        let prior = vec![vec![1, 2], vec![3]];
        assert_eq!(to_change(Some(prior.clone()), prior), None);
    }
}

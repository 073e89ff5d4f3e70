//! State writer
//!
//! Copies the attributes of an API response entity back into the
//! resource's attribute bag and sets its identity key. Used after every
//! create, read and update so that the next pass diffs against what the
//! remote actually holds.
//!
//! A failed write is a schema/type error, never a remote one.

use crate::error::Result;
use crate::resource_data::ResourceData;
use crate::resources::{account, alias, domain};
use crate::traits::{Account, Alias, Domain};

/// Recorded spelling of a name the remote only changed in case
///
/// Forward Email lowercases names; keeping the declared spelling stops a
/// mixed-case declaration from planning a replacement on every pass.
fn name_value(d: &ResourceData, key: &str, remote: &str) -> String {
    match d.get(key).as_str() {
        Some(current) if current.eq_ignore_ascii_case(remote) => current.to_string(),
        _ => remote.to_string(),
    }
}

/// Write a domain entity; identity key is the domain name
pub fn write_domain(d: &mut ResourceData, entity: &Domain) -> Result<()> {
    let name = name_value(d, domain::NAME, &entity.name);
    d.set(domain::NAME, name)?;
    d.set(domain::ADULT_CONTENT_PROTECTION, entity.has_adult_content_protection)?;
    d.set(domain::PHISHING_PROTECTION, entity.has_phishing_protection)?;
    d.set(domain::EXECUTABLE_PROTECTION, entity.has_executable_protection)?;
    d.set(domain::VIRUS_PROTECTION, entity.has_virus_protection)?;
    d.set(domain::RECIPIENT_VERIFICATION, entity.has_recipient_verification)?;
    d.set_id(&entity.name);
    Ok(())
}

/// Write an alias entity; identity key is the composite `domain/name`
pub fn write_alias(d: &mut ResourceData, entity: &Alias) -> Result<()> {
    let domain_name = name_value(d, alias::DOMAIN, &entity.domain.name);
    let name = name_value(d, alias::NAME, &entity.name);
    d.set(alias::DOMAIN, domain_name)?;
    d.set(alias::NAME, name)?;
    d.set(alias::ENABLED, entity.is_enabled)?;
    d.set(alias::RECIPIENT_VERIFICATION, entity.has_recipient_verification)?;
    d.set(alias::RECIPIENTS, &entity.recipients)?;
    d.set(alias::LABELS, &entity.labels)?;
    d.set(alias::DESCRIPTION, &entity.description)?;
    d.set_id(alias::AliasId::new(&entity.domain.name, &entity.name).to_string());
    Ok(())
}

/// Write the account; identity key is the account's own id
pub fn write_account(d: &mut ResourceData, entity: &Account) -> Result<()> {
    d.set(account::PLAN, &entity.plan)?;
    d.set(account::EMAIL, &entity.email)?;
    d.set(account::FULL_EMAIL, &entity.full_email)?;
    d.set(account::DISPLAY_NAME, &entity.display_name)?;
    d.set_id(&entity.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::DomainRef;
    use serde_json::json;

    #[test]
    fn test_write_alias_sets_composite_id() {
        let mut d = ResourceData::for_import(alias::schema(), "example.com/sales");
        let entity = Alias {
            id: "remote-1".to_string(),
            name: "sales".to_string(),
            domain: DomainRef {
                name: "example.com".to_string(),
            },
            is_enabled: true,
            has_recipient_verification: false,
            recipients: vec!["b@y.com".to_string(), "a@x.com".to_string()],
            labels: vec!["team".to_string()],
            description: "Sales inbox".to_string(),
        };

        write_alias(&mut d, &entity).unwrap();

        assert_eq!(d.id(), Some("example.com/sales"));
        assert_eq!(d.get("recipients"), json!(["b@y.com", "a@x.com"]));
        assert_eq!(d.get("description"), json!("Sales inbox"));
    }

    #[test]
    fn test_write_domain_keeps_declared_case() {
        let declared = json!({ "name": "Example.COM" });
        let mut d =
            ResourceData::for_create(domain::schema(), declared.as_object().unwrap()).unwrap();
        let entity = Domain {
            id: "d-1".to_string(),
            name: "example.com".to_string(),
            has_adult_content_protection: true,
            has_phishing_protection: true,
            has_executable_protection: true,
            has_virus_protection: true,
            has_recipient_verification: true,
        };

        write_domain(&mut d, &entity).unwrap();

        assert_eq!(d.get("name"), json!("Example.COM"));
        assert_eq!(d.id(), Some("example.com"));

        // A real rename is written as the remote reports it
        let mut renamed = ResourceData::for_import(domain::schema(), "example.com");
        write_domain(&mut renamed, &entity).unwrap();
        assert_eq!(renamed.get("name"), json!("example.com"));
    }

    #[test]
    fn test_write_account_uses_account_id() {
        let mut d = ResourceData::for_data_source(account::schema());
        let entity = Account {
            id: "acct-42".to_string(),
            plan: "enhanced_protection".to_string(),
            email: "ops@example.com".to_string(),
            full_email: "Ops <ops@example.com>".to_string(),
            display_name: "Ops".to_string(),
        };

        write_account(&mut d, &entity).unwrap();

        assert_eq!(d.id(), Some("acct-42"));
        assert_eq!(d.get_str("plan").unwrap(), "enhanced_protection");
    }
}

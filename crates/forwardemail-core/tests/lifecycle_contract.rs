//! Contract Test: Resource Lifecycle
//!
//! Verifies the create / read / delete / import callbacks against an
//! in-memory remote.
//!
//! Constraints verified:
//! - Read writes the remote's view back, list order included
//! - A missing entity reads as absent and clears the identity key
//! - Other read failures propagate
//! - Deleting an already-deleted entity fails the same way every time
//! - The account data source sets its identity key

mod common;

use common::*;
use forwardemail_core::resources::{
    AccountDataSource, AliasResource, DomainResource, account, alias, domain,
};
use forwardemail_core::traits::{DataSourceHandler, ReadOutcome, ResourceHandler, ResourceState};
use forwardemail_core::{Error, ResourceData};
use serde_json::json;

async fn create_domain(api: &MockForwardEmailApi, name: &str) -> ResourceState {
    let handler = DomainResource::new(api.handle());
    let mut d = ResourceData::for_create(domain::schema(), &attrs(json!({ "name": name }))).unwrap();
    handler.create(&mut d).await.unwrap();
    d.into_state(domain::TYPE_NAME).unwrap()
}

#[tokio::test]
async fn domain_create_writes_identity_and_toggles() {
    let api = MockForwardEmailApi::new();
    let state = create_domain(&api, "example.com").await;

    assert_eq!(state.id, "example.com");
    assert_eq!(state.attributes["name"], json!("example.com"));
    assert_eq!(state.attributes["virus_protection"], json!(true));
    assert_eq!(
        api.mutations(),
        vec![Call::CreateDomain("example.com".to_string())]
    );
}

#[tokio::test]
async fn alias_round_trip_preserves_recipient_order() {
    let api = MockForwardEmailApi::new();
    create_domain(&api, "example.com").await;

    let handler = AliasResource::new(api.handle());
    let mut d = ResourceData::for_create(
        alias::schema(),
        &attrs(json!({
            "domain": "example.com",
            "name": "sales",
            "recipients": ["z@x.com", "a@x.com", "m@x.com"],
            "labels": ["team", "billing"],
        })),
    )
    .unwrap();
    handler.create(&mut d).await.unwrap();
    assert_eq!(d.id(), Some("example.com/sales"));

    let state = d.into_state(alias::TYPE_NAME).unwrap();
    let mut refreshed = ResourceData::from_state(alias::schema(), &state);
    let outcome = handler.read(&mut refreshed).await.unwrap();

    assert_eq!(outcome, ReadOutcome::Found);
    assert_eq!(
        refreshed.get_list("recipients").unwrap(),
        vec!["z@x.com", "a@x.com", "m@x.com"]
    );
    assert_eq!(refreshed.get_list("labels").unwrap(), vec!["team", "billing"]);
    assert_eq!(refreshed.get("enabled"), json!(true));
    assert_eq!(refreshed.get("description"), json!(""));
}

#[tokio::test]
async fn read_of_missing_entity_is_absent() {
    let api = MockForwardEmailApi::new();
    let state = create_domain(&api, "example.com").await;
    api.remove_domain_out_of_band("example.com");

    let handler = DomainResource::new(api.handle());
    let mut d = ResourceData::from_state(domain::schema(), &state);
    let outcome = handler.read(&mut d).await.unwrap();

    assert_eq!(outcome, ReadOutcome::Absent);
    assert_eq!(d.id(), None, "Identity key should be cleared");
    assert!(d.into_state(domain::TYPE_NAME).is_none());
}

#[tokio::test]
async fn read_failure_other_than_not_found_propagates() {
    let api = MockForwardEmailApi::new();
    let state = create_domain(&api, "example.com").await;
    api.fail_domain("example.com");

    let handler = DomainResource::new(api.handle());
    let mut d = ResourceData::from_state(domain::schema(), &state);
    let err = handler.read(&mut d).await.unwrap_err();

    assert!(matches!(err, Error::Remote { status: Some(500), .. }));
    assert_eq!(d.id(), Some("example.com"), "Identity key must survive a failed read");
}

#[tokio::test]
async fn repeated_delete_fails_consistently() {
    let api = MockForwardEmailApi::new();
    let state = create_domain(&api, "example.com").await;
    let handler = DomainResource::new(api.handle());

    let mut first = ResourceData::from_state(domain::schema(), &state);
    handler.delete(&mut first).await.unwrap();
    assert_eq!(first.id(), None);

    for _ in 0..2 {
        let mut again = ResourceData::from_state(domain::schema(), &state);
        let err = handler.delete(&mut again).await.unwrap_err();
        assert!(err.is_not_found(), "Expected a 404 remote error, got {err:?}");
        assert!(!err.is_config());
    }
}

#[tokio::test]
async fn alias_state_with_bare_name_id_still_resolves() {
    let api = MockForwardEmailApi::new();
    create_domain(&api, "example.com").await;
    let handler = AliasResource::new(api.handle());

    let mut d = ResourceData::for_create(
        alias::schema(),
        &attrs(json!({ "domain": "example.com", "name": "sales", "recipients": ["a@x.com"] })),
    )
    .unwrap();
    handler.create(&mut d).await.unwrap();

    let mut legacy = d.into_state(alias::TYPE_NAME).unwrap();
    legacy.id = "sales".to_string();

    let mut refreshed = ResourceData::from_state(alias::schema(), &legacy);
    assert_eq!(handler.read(&mut refreshed).await.unwrap(), ReadOutcome::Found);
    assert_eq!(refreshed.id(), Some("example.com/sales"));
}

#[tokio::test]
async fn import_adopts_existing_alias() {
    let api = MockForwardEmailApi::new();
    create_domain(&api, "example.com").await;
    let handler = AliasResource::new(api.handle());

    let mut d = ResourceData::for_create(
        alias::schema(),
        &attrs(json!({ "domain": "example.com", "name": "ops", "labels": ["infra"] })),
    )
    .unwrap();
    handler.create(&mut d).await.unwrap();

    let imported = handler.import("example.com/ops").await.unwrap();
    assert_eq!(imported.get("domain"), json!("example.com"));
    assert_eq!(imported.get_list("labels").unwrap(), vec!["infra"]);

    let missing = handler.import("example.com/nobody").await.unwrap_err();
    assert!(matches!(missing, Error::InvalidInput(_)));

    let malformed = handler.import("no-slash").await.unwrap_err();
    assert!(matches!(malformed, Error::InvalidInput(_)));
}

#[tokio::test]
async fn account_read_sets_identity() {
    let api = MockForwardEmailApi::new();
    let handler = AccountDataSource::new(api.handle());

    let mut d = ResourceData::for_data_source(account::schema());
    handler.read(&mut d).await.unwrap();

    assert_eq!(d.id(), Some("acct-1"));
    assert_eq!(d.get_str("plan").unwrap(), "enhanced_protection");
    assert_eq!(d.get_str("display_name").unwrap(), "Owner");
    assert_eq!(api.calls(), vec![Call::GetAccount]);
}

//! Editing flows around the save cycle: local validation, dependent
//! removal, preferred flags, and candidate lookup.

mod common;

use assert_matches::assert_matches;
use common::Harness;
use stemma_core::{Candidate, EntityKind, EntityRef, FieldValue, Key};
use stemma_session::workflows;
use stemma_session::{ClearOutcome, SessionError, SessionState};
use stemma_testkit::fixtures;

#[tokio::test]
async fn validation_fails_locally_before_any_request() {
    let harness = Harness::new();
    let session = harness.shared(harness.new_person()).await;

    let err = session
        .write()
        .await
        .edit_field("surname", FieldValue::from("   "))
        .unwrap_err();
    assert_matches!(err, SessionError::Validation { field, .. } if field == "surname");

    // The rejected edit never dirtied the session or reached the gateway.
    assert_eq!(session.read().await.state(), SessionState::Clean);
    assert_eq!(harness.gateway.call_count().await, 0);
}

#[tokio::test]
async fn removal_goes_through_the_gateway_before_the_list() {
    let harness = Harness::new();
    let session = harness.shared(harness.over(fixtures::person_with_events(77))).await;
    let target = EntityRef::assigned(EntityKind::Event, Key::new(11));

    // A failed removal leaves the row in place for retry.
    harness.gateway.drop_next().await;
    let err = workflows::remove_dependent(&session, target).await.unwrap_err();
    assert_matches!(err, SessionError::Transport { .. });
    assert_eq!(
        session
            .read()
            .await
            .record()
            .dependents_of(EntityKind::Event)
            .len(),
        2
    );

    workflows::remove_dependent(&session, target)
        .await
        .expect("removal");
    let guard = session.read().await;
    let events = guard.record().dependents_of(EntityKind::Event);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity.key(), Some(Key::new(12)));
}

#[tokio::test]
async fn non_optional_preferred_reverts_through_the_session() {
    let harness = Harness::new();
    let mut record = fixtures::person_with_events(77);
    {
        let mut name = stemma_core::DependentRow::new(
            EntityKind::Name,
            record.entity,
            "Names",
        );
        name.entity = EntityRef::assigned(EntityKind::Name, Key::new(40));
        name.group_key = Some("primary".to_string());
        name.preferred = true;
        name.changed = false;
        record.dependents_of_mut(EntityKind::Name).push(name);
    }
    let session = harness.shared(harness.over(record)).await;

    let target = EntityRef::assigned(EntityKind::Name, Key::new(40));
    let outcome = session
        .write()
        .await
        .clear_preferred(target)
        .expect("clear");
    assert_eq!(outcome, ClearOutcome::Reverted);

    // Reverts leave nothing to save.
    let guard = session.read().await;
    assert_eq!(guard.state(), SessionState::Clean);
    assert!(guard.record().dependents_of(EntityKind::Name)[0].preferred);
}

#[tokio::test]
async fn candidate_lookup_passes_through() {
    let harness = Harness::new();
    harness
        .gateway
        .stock_candidates(vec![
            Candidate {
                id: Key::new(301),
                label: "Janssen, Willem".to_string(),
            },
            Candidate {
                id: Key::new(302),
                label: "Bakker, Aaltje".to_string(),
            },
        ])
        .await;
    let session = harness.shared(harness.over(fixtures::person_with_events(77))).await;

    let hits = workflows::lookup_candidates(&session, EntityKind::Person, "jans")
        .await
        .expect("lookup");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, Key::new(301));
}

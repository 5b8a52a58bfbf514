//! Feedback channel: a child's confirmed save patches the opener's state,
//! merges its row in order, releases the registry entry, and unlocks the
//! root controls, in exactly that order, and idempotently.

mod common;

use assert_matches::assert_matches;
use common::Harness;
use stemma_core::{EntityKind, EntityRef, FieldValue, Key, SortKey};
use stemma_session::workflows::{self, ActionOutcome, CommitOutcome};
use stemma_session::{FeedbackDisposition, FeedbackMessage, Intent, SessionState};
use stemma_testkit::fixtures;

async fn open_event_surface(
    session: &stemma_session::SharedSession,
) -> stemma_session::OpenedSurface {
    let outcome = workflows::request_dependent_action(session, Intent::OpenEventEditor {
        event: None,
    })
    .await
    .expect("open event surface");
    match outcome {
        ActionOutcome::Performed(opened) => opened,
        other => panic!("expected an immediate open, got {other:?}"),
    }
}

#[tokio::test]
async fn child_commit_feeds_back_into_the_opener() {
    let harness = Harness::new();
    let parent = harness.shared(harness.over(fixtures::person_with_events(77))).await;
    let opened = open_event_surface(&parent).await;

    // While the surface is open, its controls are locked at the opener.
    assert!(!parent.read().await.is_control_enabled(EntityKind::Event));

    let child = harness.shared(harness.child(&opened.child)).await;
    {
        let mut guard = child.write().await;
        guard
            .edit_field("type", FieldValue::from("residence"))
            .expect("edit type");
        guard
            .edit_field("date", FieldValue::from(20i64))
            .expect("edit date");
    }

    let outcome = workflows::commit(&child).await.expect("child commit");
    assert_matches!(
        outcome,
        CommitOutcome::Saved {
            id,
            feedback: Some(FeedbackDisposition::Delivered),
            ..
        } if id == Key::new(501)
    );

    let guard = parent.read().await;
    let events = guard.record().dependents_of(EntityKind::Event);
    let sorts: Vec<i64> = events.iter().map(|row| row.sort_key.value()).collect();
    // The new row merged between the existing 10 and 30.
    assert_eq!(sorts, vec![10, 20, 30]);
    assert_eq!(events[1].entity.key(), Some(Key::new(501)));
    // Cleanup ran after application; controls unlocked last.
    assert_eq!(guard.registry().open_count(), 0);
    assert!(guard.is_control_enabled(EntityKind::Event));
    // Feedback application dirties the opener.
    assert_eq!(guard.state(), SessionState::Dirty);
}

#[tokio::test]
async fn equal_sort_keys_merge_stably() {
    let harness = Harness::new();
    let parent = harness.shared(harness.over(fixtures::person_with_events(77))).await;

    for date in [20i64, 20] {
        let opened = open_event_surface(&parent).await;
        let child = harness.shared(harness.child(&opened.child)).await;
        {
            let mut guard = child.write().await;
            guard
                .edit_field("type", FieldValue::from("residence"))
                .expect("edit type");
            guard
                .edit_field("date", FieldValue::from(date))
                .expect("edit date");
        }
        workflows::commit(&child).await.expect("child commit");
    }

    let guard = parent.read().await;
    let events = guard.record().dependents_of(EntityKind::Event);
    let view: Vec<(i64, u64)> = events
        .iter()
        .map(|row| {
            (
                row.sort_key.value(),
                row.entity.key().map(|k| k.value()).unwrap_or_default(),
            )
        })
        .collect();
    // The second equal-key row lands after the first: 10, 20, 20', 30.
    assert_eq!(view, vec![(10, 11), (20, 501), (20, 502), (30, 12)]);
}

#[tokio::test]
async fn feedback_is_idempotent() {
    let harness = Harness::new();
    let parent = harness.shared(harness.over(fixtures::person_with_events(77))).await;
    let opened = open_event_surface(&parent).await;

    let message = FeedbackMessage {
        entity: EntityRef::assigned(EntityKind::Event, Key::new(501)),
        owner: EntityRef::assigned(EntityKind::Person, Key::new(77)),
        sort_key: SortKey::new(20),
        preferred: false,
        group_key: Some("residence".to_string()),
        title: "Events".to_string(),
        fields: fixtures::event_fields("residence", 20),
    };

    {
        let mut guard = parent.write().await;
        guard
            .apply_feedback(opened.surface, &message)
            .expect("first delivery");
    }
    let after_first = parent.read().await.record().clone();

    {
        let mut guard = parent.write().await;
        guard
            .apply_feedback(opened.surface, &message)
            .expect("second delivery");
    }
    let after_second = parent.read().await.record().clone();

    // Same message twice, same state: no duplicate row.
    assert_eq!(after_first, after_second);
    assert_eq!(
        after_second.dependents_of(EntityKind::Event).len(),
        3
    );
}

#[tokio::test]
async fn preferred_feedback_keeps_the_group_exclusive() {
    let harness = Harness::new();
    let mut record = fixtures::person_with_events(77);
    {
        let events = record.dependents_of_mut(EntityKind::Event);
        for row in events.iter_mut() {
            row.group_key = Some("residence".to_string());
        }
        events[0].preferred = true;
    }
    let parent = harness.shared(harness.over(record)).await;
    let opened = open_event_surface(&parent).await;

    let message = FeedbackMessage {
        entity: EntityRef::assigned(EntityKind::Event, Key::new(501)),
        owner: EntityRef::assigned(EntityKind::Person, Key::new(77)),
        sort_key: SortKey::new(20),
        preferred: true,
        group_key: Some("residence".to_string()),
        title: "Events".to_string(),
        fields: fixtures::event_fields("residence", 20),
    };
    parent
        .write()
        .await
        .apply_feedback(opened.surface, &message)
        .expect("delivery");

    let guard = parent.read().await;
    let preferred: Vec<Key> = guard
        .record()
        .dependents_of(EntityKind::Event)
        .iter()
        .filter(|row| row.preferred)
        .filter_map(|row| row.entity.key())
        .collect();
    assert_eq!(preferred, vec![Key::new(501)]);
}

#[tokio::test]
async fn unreachable_opener_is_reported_not_retried() {
    let harness = Harness::new();
    let parent = harness.shared(harness.over(fixtures::person_with_events(77))).await;
    let opened = open_event_surface(&parent).await;

    // The child outlives its opener's registration.
    let child = harness.shared(harness.child(&opened.child)).await;
    harness.router.unregister(parent.read().await.id()).await;

    {
        let mut guard = child.write().await;
        guard
            .edit_field("type", FieldValue::from("residence"))
            .expect("edit type");
    }
    let outcome = workflows::commit(&child).await.expect("child commit");
    assert_matches!(
        outcome,
        CommitOutcome::Saved {
            feedback: Some(FeedbackDisposition::OpenerUnreachable),
            ..
        }
    );

    // The opener never saw the commit; its list is unchanged and the
    // child's own state stayed canonical.
    let guard = parent.read().await;
    assert_eq!(guard.record().dependents_of(EntityKind::Event).len(), 2);
    assert!(child.read().await.record().entity.is_assigned());
}

#[tokio::test]
async fn closing_without_commit_discards_and_unlocks() {
    let harness = Harness::new();
    let parent = harness.shared(harness.over(fixtures::person_with_events(77))).await;
    let opened = open_event_surface(&parent).await;

    {
        let mut guard = parent.write().await;
        guard.close_surface(opened.surface).expect("close");
        assert_eq!(guard.registry().open_count(), 0);
        assert!(guard.is_control_enabled(EntityKind::Event));
    }
    // No compensating request for the abandoned surface.
    assert_eq!(harness.gateway.call_count().await, 0);
    // The list is exactly as loaded.
    assert_eq!(
        parent
            .read()
            .await
            .record()
            .dependents_of(EntityKind::Event)
            .len(),
        2
    );
}

use serde_json::json;
use std::sync::Arc;
use tidemark_core::{
    ItemDraft, ItemPatch, ItemStatus, ItemValidationError, ManualClock, Priority, StatusFilter,
    StoreService, RETENTION_MS,
};
use uuid::Uuid;

const T0: i64 = 1_700_000_000_000;

fn store_with_clock() -> (StoreService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    (StoreService::local(clock.clone()), clock)
}

#[test]
fn insert_applies_defaults_and_stamps() {
    let (mut store, _clock) = store_with_clock();

    let item = store.insert(ItemDraft::new("first")).unwrap();
    assert_eq!(item.status, ItemStatus::Inbox);
    assert_eq!(item.priority, Priority::None);
    assert_eq!(item.created_at, T0);
    assert_eq!(item.updated_at, T0);
    assert_eq!(item.completed_at, None);
    assert_eq!(item.deleted_at, None);
    assert_eq!(item.order_key, 0.0);
}

#[test]
fn insert_rejects_blank_title() {
    let (mut store, _clock) = store_with_clock();

    let err = store.insert(ItemDraft::new("   ")).unwrap_err();
    assert_eq!(err, ItemValidationError::EmptyTitle);
    assert!(store.by_status(StatusFilter::All).is_empty());
}

#[test]
fn insert_derives_plain_text_projection() {
    let (mut store, _clock) = store_with_clock();

    let mut draft = ItemDraft::new("note");
    draft.body = Some(json!({
        "type": "doc",
        "content": [
            { "type": "paragraph", "content": [{ "type": "text", "text": "buy milk" }] }
        ]
    }));
    let item = store.insert(draft).unwrap();
    assert_eq!(item.body_text, "buy milk");
}

#[test]
fn insert_folds_and_dedupes_tags() {
    let (mut store, _clock) = store_with_clock();

    let mut draft = ItemDraft::new("tagged");
    draft.tags = vec![" Home ".to_string(), "home".to_string(), "Work".to_string()];
    let item = store.insert(draft).unwrap();
    assert_eq!(
        item.tags.into_iter().collect::<Vec<_>>(),
        vec!["home".to_string(), "work".to_string()]
    );
}

#[test]
fn done_transition_tracks_completed_at() {
    let (mut store, clock) = store_with_clock();
    let item = store.insert(ItemDraft::new("task")).unwrap();

    clock.advance(5_000);
    store
        .update(item.id, &ItemPatch::with_status(ItemStatus::Done))
        .unwrap();
    let done = store.get(item.id).unwrap().clone();
    assert_eq!(done.completed_at, Some(T0 + 5_000));

    // Re-asserting done is idempotent: completed_at does not move.
    clock.advance(5_000);
    store
        .update(item.id, &ItemPatch::with_status(ItemStatus::Done))
        .unwrap();
    assert_eq!(store.get(item.id).unwrap().completed_at, Some(T0 + 5_000));

    store
        .update(item.id, &ItemPatch::with_status(ItemStatus::Todo))
        .unwrap();
    assert_eq!(store.get(item.id).unwrap().completed_at, None);
}

#[test]
fn update_unknown_id_is_silent_noop() {
    let (mut store, _clock) = store_with_clock();
    store.insert(ItemDraft::new("only")).unwrap();

    store
        .update(Uuid::new_v4(), &ItemPatch::with_status(ItemStatus::Done))
        .unwrap();
    assert_eq!(store.by_status(StatusFilter::All).len(), 1);
}

#[test]
fn update_rejects_blank_title_without_mutation() {
    let (mut store, _clock) = store_with_clock();
    let item = store.insert(ItemDraft::new("keep me")).unwrap();

    let patch = ItemPatch {
        title: Some("  ".to_string()),
        ..ItemPatch::default()
    };
    let err = store.update(item.id, &patch).unwrap_err();
    assert_eq!(err, ItemValidationError::EmptyTitle);
    assert_eq!(store.get(item.id).unwrap().title, "keep me");
}

#[test]
fn soft_delete_hides_from_projections_but_keeps_direct_lookup() {
    let (mut store, _clock) = store_with_clock();
    let item = store.insert(ItemDraft::new("doomed")).unwrap();

    store.soft_delete(item.id);
    assert!(store.by_status(StatusFilter::All).is_empty());
    assert!(store.by_status(StatusFilter::Inbox).is_empty());

    let tombstone = store.get(item.id).unwrap();
    assert_eq!(tombstone.deleted_at, Some(T0));
}

#[test]
fn tombstone_accepts_no_field_edits_until_restored() {
    let (mut store, _clock) = store_with_clock();
    let item = store.insert(ItemDraft::new("original")).unwrap();
    store.soft_delete(item.id);

    let patch = ItemPatch {
        title: Some("changed".to_string()),
        ..ItemPatch::default()
    };
    store.update(item.id, &patch).unwrap();
    assert_eq!(store.get(item.id).unwrap().title, "original");

    store.restore(item.id);
    assert!(store.get(item.id).unwrap().is_active());
    store.update(item.id, &patch).unwrap();
    assert_eq!(store.get(item.id).unwrap().title, "changed");
}

#[test]
fn purge_honors_seven_day_retention_window() {
    let (mut store, clock) = store_with_clock();
    let item = store.insert(ItemDraft::new("expiring")).unwrap();
    store.soft_delete(item.id);

    clock.advance(6 * 24 * 60 * 60 * 1000);
    assert_eq!(store.purge_expired(), 0);
    assert!(store.get(item.id).is_some());

    clock.set(T0 + RETENTION_MS + 1);
    assert_eq!(store.purge_expired(), 1);
    assert!(store.get(item.id).is_none());

    // Idempotent and advisory.
    assert_eq!(store.purge_expired(), 0);
}

#[test]
fn restore_before_purge_survives_later_sweeps() {
    let (mut store, clock) = store_with_clock();
    let item = store.insert(ItemDraft::new("saved")).unwrap();
    store.soft_delete(item.id);

    clock.advance(2 * 24 * 60 * 60 * 1000);
    store.restore(item.id);

    clock.advance(30 * 24 * 60 * 60 * 1000);
    assert_eq!(store.purge_expired(), 0);
    assert!(store.get(item.id).unwrap().is_active());
}

#[test]
fn hub_assignment_drives_by_hub_projection() {
    let (mut store, _clock) = store_with_clock();
    let hub_id = Uuid::new_v4();
    let item = store.insert(ItemDraft::new("grouped")).unwrap();

    let assign = ItemPatch {
        hub_id: Some(Some(hub_id)),
        ..ItemPatch::default()
    };
    store.update(item.id, &assign).unwrap();
    assert_eq!(store.by_hub(hub_id).len(), 1);

    let clear = ItemPatch {
        hub_id: Some(None),
        ..ItemPatch::default()
    };
    store.update(item.id, &clear).unwrap();
    assert!(store.by_hub(hub_id).is_empty());
}

#[test]
fn body_update_rederives_projection_and_bumps_updated_at() {
    let (mut store, clock) = store_with_clock();
    let item = store.insert(ItemDraft::new("note")).unwrap();

    clock.advance(1_000);
    let patch = ItemPatch {
        body: Some(json!({ "type": "text", "text": "rewritten" })),
        ..ItemPatch::default()
    };
    store.update(item.id, &patch).unwrap();

    let updated = store.get(item.id).unwrap();
    assert_eq!(updated.body_text, "rewritten");
    assert_eq!(updated.updated_at, T0 + 1_000);
    assert_eq!(updated.created_at, T0);
}

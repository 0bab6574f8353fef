use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use tidemark_core::{
    Item, ItemDraft, ItemPatch, ItemStatus, ManualClock, OutboundChange, Priority, RemoteError,
    RemoteEvent, RemoteReplica, RemoteResult, RemoteSubscription, StatusFilter, StoreService,
    SyncConfig, SyncReconciler, SyncStage, SyncState,
};
use uuid::Uuid;

const T0: i64 = 1_700_000_000_000;

fn config() -> SyncConfig {
    SyncConfig {
        endpoint: "https://replica.test".to_string(),
        principal: "user-1".to_string(),
        access_token: "token".to_string(),
    }
}

fn remote_row(title: &str, order_key: f64) -> Item {
    Item {
        id: Uuid::new_v4(),
        title: title.to_string(),
        body: Value::Null,
        body_text: String::new(),
        status: ItemStatus::Inbox,
        priority: Priority::None,
        tags: BTreeSet::new(),
        hub_id: None,
        order_key,
        created_at: T0,
        updated_at: T0,
        completed_at: None,
        deleted_at: None,
    }
}

#[derive(Default)]
struct MockReplica {
    rows: Mutex<Vec<Item>>,
    published: Mutex<Vec<OutboundChange>>,
    feed: Arc<Mutex<VecDeque<RemoteEvent>>>,
    subscription_closed: Arc<Mutex<bool>>,
    fail_pull: bool,
    fail_publish: bool,
}

impl MockReplica {
    fn with_rows(rows: Vec<Item>) -> Arc<Self> {
        let replica = Self::default();
        *replica.rows.lock().unwrap() = rows;
        Arc::new(replica)
    }

    fn failing_pull() -> Arc<Self> {
        Arc::new(Self {
            fail_pull: true,
            ..Self::default()
        })
    }

    fn failing_publish() -> Arc<Self> {
        Arc::new(Self {
            fail_publish: true,
            ..Self::default()
        })
    }

    fn push_event(&self, event: RemoteEvent) {
        self.feed.lock().unwrap().push_back(event);
    }

    fn published(&self) -> Vec<OutboundChange> {
        self.published.lock().unwrap().clone()
    }
}

struct MockSubscription {
    feed: Arc<Mutex<VecDeque<RemoteEvent>>>,
    closed_flag: Arc<Mutex<bool>>,
    closed: bool,
}

impl RemoteSubscription for MockSubscription {
    fn try_next(&mut self) -> Option<RemoteEvent> {
        if self.closed {
            return None;
        }
        self.feed.lock().unwrap().pop_front()
    }

    fn close(&mut self) {
        self.closed = true;
        *self.closed_flag.lock().unwrap() = true;
    }
}

impl RemoteReplica for MockReplica {
    fn replica_id(&self) -> &str {
        "mock"
    }

    fn fetch_all(&self, _principal: &str) -> RemoteResult<Vec<Item>> {
        if self.fail_pull {
            return Err(RemoteError::new(
                "mock",
                SyncStage::Pull,
                "unavailable",
                "bulk pull refused",
                true,
            ));
        }
        Ok(self.rows.lock().unwrap().clone())
    }

    fn publish(&self, change: &OutboundChange) -> RemoteResult<()> {
        if self.fail_publish {
            return Err(RemoteError::new(
                "mock",
                SyncStage::Publish,
                "unavailable",
                "publish refused",
                true,
            ));
        }
        self.published.lock().unwrap().push(change.clone());
        Ok(())
    }

    fn subscribe(&self) -> RemoteResult<Box<dyn RemoteSubscription>> {
        Ok(Box::new(MockSubscription {
            feed: Arc::clone(&self.feed),
            closed_flag: Arc::clone(&self.subscription_closed),
            closed: false,
        }))
    }
}

fn synced_store(replica: Arc<MockReplica>) -> StoreService {
    let reconciler = SyncReconciler::connected(config(), replica).unwrap();
    StoreService::new(Arc::new(ManualClock::new(T0)), reconciler)
}

#[test]
fn local_only_store_stays_disabled_with_no_remote_calls() {
    let mut store = StoreService::local(Arc::new(ManualClock::new(T0)));

    let item = store.insert(ItemDraft::new("offline")).unwrap();
    store
        .update(item.id, &ItemPatch::with_status(ItemStatus::Todo))
        .unwrap();

    assert_eq!(store.sync_state(), &SyncState::Disabled);
    assert_eq!(store.start_sync(), Ok(()));
    assert_eq!(store.flush_outbound(), 0);
    assert_eq!(store.pump_sync(), 0);
}

#[test]
fn start_replaces_local_state_wholesale_and_goes_live() {
    let remote_a = remote_row("remote a", 0.0);
    let remote_b = remote_row("remote b", 1000.0);
    let replica = MockReplica::with_rows(vec![remote_a.clone(), remote_b.clone()]);
    let mut store = synced_store(Arc::clone(&replica));

    let local_orphan = store.insert(ItemDraft::new("local only")).unwrap();
    store.start_sync().unwrap();

    assert_eq!(store.sync_state(), &SyncState::Live);
    let all = store.by_status(StatusFilter::All);
    assert_eq!(all.len(), 2);
    assert!(store.get(remote_a.id).is_some());
    assert!(store.get(remote_b.id).is_some());
    assert!(store.get(local_orphan.id).is_none());
}

#[test]
fn failed_pull_leaves_prior_local_state_untouched() {
    let replica = MockReplica::failing_pull();
    let mut store = synced_store(Arc::clone(&replica));
    let survivor = store.insert(ItemDraft::new("survivor")).unwrap();

    let err = store.start_sync().unwrap_err();
    assert!(err.retryable);
    assert!(matches!(store.sync_state(), SyncState::Failed(inner) if inner.retryable));
    assert!(store.get(survivor.id).is_some());
    assert_eq!(store.by_status(StatusFilter::All).len(), 1);
}

#[test]
fn local_mutations_publish_insert_then_changed_fields() {
    let replica = MockReplica::with_rows(Vec::new());
    let mut store = synced_store(Arc::clone(&replica));
    store.start_sync().unwrap();

    let item = store.insert(ItemDraft::new("shared")).unwrap();
    assert_eq!(store.flush_outbound(), 1);

    store
        .update(item.id, &ItemPatch::with_status(ItemStatus::Todo))
        .unwrap();
    assert_eq!(store.flush_outbound(), 1);

    store.soft_delete(item.id);
    assert_eq!(store.flush_outbound(), 1);

    let published = replica.published();
    assert_eq!(published.len(), 3);
    assert!(matches!(&published[0], OutboundChange::Insert(row) if row.id == item.id));

    let OutboundChange::Update { id, fields } = &published[1] else {
        panic!("expected a partial update, got {:?}", published[1]);
    };
    assert_eq!(*id, item.id);
    assert_eq!(fields.get("status"), Some(&serde_json::json!("todo")));
    assert!(!fields.contains_key("title"));

    // Soft-delete mirrors as an update carrying the tombstone stamp, never
    // as a remote delete.
    let OutboundChange::Update { id, fields } = &published[2] else {
        panic!("expected a tombstone update, got {:?}", published[2]);
    };
    assert_eq!(*id, item.id);
    assert_eq!(fields.get("deleted_at"), Some(&serde_json::json!(T0)));
}

#[test]
fn publish_failure_keeps_local_optimistic_write() {
    let replica = MockReplica::failing_publish();
    let mut store = synced_store(Arc::clone(&replica));
    store.start_sync().unwrap();

    let item = store.insert(ItemDraft::new("optimistic")).unwrap();
    assert_eq!(store.flush_outbound(), 0);

    assert_eq!(store.sync_state(), &SyncState::Live);
    assert!(store.get(item.id).is_some());
    assert!(replica.published().is_empty());
}

#[test]
fn remote_insert_applies_once_for_unknown_ids() {
    let replica = MockReplica::with_rows(Vec::new());
    let mut store = synced_store(Arc::clone(&replica));
    store.start_sync().unwrap();

    let row = remote_row("from another device", -500.0);
    replica.push_event(RemoteEvent::Inserted(row.clone()));
    assert_eq!(store.pump_sync(), 1);
    assert_eq!(store.get(row.id).unwrap().title, "from another device");

    // Redelivery of a known id does not duplicate.
    replica.push_event(RemoteEvent::Inserted(row.clone()));
    store.pump_sync();
    assert_eq!(store.by_status(StatusFilter::All).len(), 1);
}

#[test]
fn remote_update_replaces_row_wholesale() {
    let seeded = remote_row("seeded", 0.0);
    let other = remote_row("other", 1000.0);
    let replica = MockReplica::with_rows(vec![seeded.clone(), other.clone()]);
    let mut store = synced_store(Arc::clone(&replica));
    store.start_sync().unwrap();

    let mut superseding = seeded.clone();
    superseding.title = "remote wins".to_string();
    superseding.priority = Priority::Urgent;
    superseding.updated_at = T0 + 60_000;
    replica.push_event(RemoteEvent::Updated(superseding.clone()));
    assert_eq!(store.pump_sync(), 1);

    let local = store.get(seeded.id).unwrap();
    assert_eq!(local.title, "remote wins");
    assert_eq!(local.priority, Priority::Urgent);
    assert_eq!(local.updated_at, T0 + 60_000);

    // The unrelated row is untouched.
    assert_eq!(store.get(other.id).unwrap().title, "other");
}

#[test]
fn remote_update_for_unknown_id_is_a_noop() {
    let replica = MockReplica::with_rows(Vec::new());
    let mut store = synced_store(Arc::clone(&replica));
    store.start_sync().unwrap();

    replica.push_event(RemoteEvent::Updated(remote_row("ghost", 0.0)));
    store.pump_sync();
    assert!(store.by_status(StatusFilter::All).is_empty());
}

#[test]
fn remote_delete_bypasses_tombstone_retention() {
    let seeded = remote_row("seeded", 0.0);
    let replica = MockReplica::with_rows(vec![seeded.clone()]);
    let mut store = synced_store(Arc::clone(&replica));
    store.start_sync().unwrap();

    replica.push_event(RemoteEvent::Deleted(seeded.id));
    assert_eq!(store.pump_sync(), 1);

    // Physically gone: not even direct lookup sees a tombstone.
    assert!(store.get(seeded.id).is_none());
}

#[test]
fn published_changes_do_not_echo_back_into_the_store() {
    let replica = MockReplica::with_rows(Vec::new());
    let mut store = synced_store(Arc::clone(&replica));
    store.start_sync().unwrap();

    let item = store.insert(ItemDraft::new("mine")).unwrap();
    assert_eq!(store.flush_outbound(), 1);

    // The replica reflects our own insert on the realtime feed, then a local
    // edit lands before the echo drains.
    replica.push_event(RemoteEvent::Inserted(item.clone()));
    store
        .update(
            item.id,
            &ItemPatch {
                title: Some("local edit".to_string()),
                ..ItemPatch::default()
            },
        )
        .unwrap();

    assert_eq!(store.pump_sync(), 0);
    assert_eq!(store.get(item.id).unwrap().title, "local edit");

    // A genuine remote update for the same id still applies afterwards.
    let mut from_other_device = store.get(item.id).unwrap().clone();
    from_other_device.title = "other device".to_string();
    replica.push_event(RemoteEvent::Updated(from_other_device));
    assert_eq!(store.pump_sync(), 1);
    assert_eq!(store.get(item.id).unwrap().title, "other device");
}

#[test]
fn remote_origin_changes_are_never_republished() {
    let replica = MockReplica::with_rows(Vec::new());
    let mut store = synced_store(Arc::clone(&replica));
    store.start_sync().unwrap();

    replica.push_event(RemoteEvent::Inserted(remote_row("incoming", 0.0)));
    assert_eq!(store.pump_sync(), 1);

    assert_eq!(store.flush_outbound(), 0);
    assert!(replica.published().is_empty());
}

#[test]
fn stop_closes_subscription_and_silences_the_feed() {
    let replica = MockReplica::with_rows(Vec::new());
    let mut store = synced_store(Arc::clone(&replica));
    store.start_sync().unwrap();

    store.stop_sync();
    assert_eq!(store.sync_state(), &SyncState::Disabled);
    assert!(*replica.subscription_closed.lock().unwrap());

    replica.push_event(RemoteEvent::Inserted(remote_row("late", 0.0)));
    assert_eq!(store.pump_sync(), 0);
    assert!(store.by_status(StatusFilter::All).is_empty());
}

//! Reconciliation between the local store and a remote replica.
//!
//! # Responsibility
//! - Drive the `Disabled -> Loading -> Live -> Failed` lifecycle.
//! - Replace local state wholesale from the bulk pull, then apply realtime
//!   events as they drain.
//! - Collect local mutations for outbound publish and suppress the echo the
//!   replica sends back for each successful publish.
//!
//! # Invariants
//! - A failed pull or subscribe leaves prior local state untouched.
//! - Publish failures are logged and never roll back the local optimistic
//!   write; the next successful sync reconciles drift.
//! - Echo suppression is budgeted per item id, one credit per successful
//!   publish, instead of a shared reentrancy flag.

use crate::model::item::ItemId;
use crate::repo::item_repo::{
    ItemRepository, MutationEvent, MutationKind, MutationObserver, MutationOrigin,
};
use crate::sync::config::{SyncConfig, SyncConfigError};
use crate::sync::remote::{
    changed_fields, OutboundChange, RemoteError, RemoteEvent, RemoteReplica, RemoteSubscription,
};
use log::{error, info, warn};
use serde_json::Map;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Reconciler lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// No replica configured, or the session was stopped. Local operations
    /// behave identically with no remote calls.
    Disabled,
    /// Bulk pull and subscription setup in progress.
    Loading,
    Live,
    /// Pull or subscribe failed; `start` may be retried when the error is
    /// retryable.
    Failed(RemoteError),
}

/// Repository observer that queues Local-origin mutations for publish.
///
/// Remote-origin mutations are skipped here by origin tag, so a change the
/// reconciler just applied can never loop back outward.
pub struct OutboundCollector {
    queue: Arc<Mutex<VecDeque<OutboundChange>>>,
}

impl MutationObserver for OutboundCollector {
    fn on_mutation(&self, event: &MutationEvent) {
        if event.origin == MutationOrigin::Remote {
            return;
        }
        let change = match &event.kind {
            MutationKind::Inserted(item) => Some(OutboundChange::Insert(item.clone())),
            MutationKind::Updated { before, after } => {
                let fields = changed_fields(before, after);
                if fields.is_empty() {
                    None
                } else {
                    Some(OutboundChange::Update {
                        id: after.id,
                        fields,
                    })
                }
            }
            MutationKind::SoftDeleted(item) => {
                let mut fields = Map::new();
                fields.insert("deleted_at".to_string(), serde_json::json!(item.deleted_at));
                Some(OutboundChange::Update {
                    id: item.id,
                    fields,
                })
            }
            // Physical removals are purge housekeeping or remote-initiated;
            // neither publishes.
            MutationKind::Removed(_) => None,
        };

        let Some(change) = change else { return };
        let Ok(mut queue) = self.queue.lock() else {
            error!("event=sync_collect module=sync status=error error_code=queue_poisoned");
            return;
        };
        queue.push_back(change);
    }
}

/// Reconciles one local repository against one remote replica.
pub struct SyncReconciler {
    remote: Option<Arc<dyn RemoteReplica>>,
    config: Option<SyncConfig>,
    state: SyncState,
    outbound: Arc<Mutex<VecDeque<OutboundChange>>>,
    /// Expected echo credits per item id; one per successful publish.
    pending_echo: HashMap<ItemId, u32>,
    subscription: Option<Box<dyn RemoteSubscription>>,
}

impl SyncReconciler {
    /// Reconciler with no replica. Every operation is a no-op.
    pub fn disabled() -> Self {
        Self {
            remote: None,
            config: None,
            state: SyncState::Disabled,
            outbound: Arc::new(Mutex::new(VecDeque::new())),
            pending_echo: HashMap::new(),
            subscription: None,
        }
    }

    /// Reconciler bound to a validated replica configuration.
    ///
    /// The state stays `Disabled` until `start` runs: no remote traffic
    /// occurs before the owning session asks for it.
    pub fn connected(
        config: SyncConfig,
        remote: Arc<dyn RemoteReplica>,
    ) -> Result<Self, SyncConfigError> {
        config.validate()?;
        Ok(Self {
            remote: Some(remote),
            config: Some(config),
            ..Self::disabled()
        })
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Observer to register on the repository, when a replica is configured.
    pub fn collector(&self) -> Option<Arc<OutboundCollector>> {
        self.remote.as_ref().map(|_| {
            Arc::new(OutboundCollector {
                queue: Arc::clone(&self.outbound),
            })
        })
    }

    /// Performs the bulk pull and opens the realtime subscription.
    ///
    /// Both remote calls must succeed before local state is touched; the
    /// wholesale replacement and the flip to `Live` happen together after.
    /// Queued outbound changes from before the pull are discarded; the
    /// replacement superseded the rows they described.
    pub fn start(&mut self, repo: &mut ItemRepository) -> Result<(), RemoteError> {
        let (Some(remote), Some(config)) = (self.remote.clone(), self.config.clone()) else {
            return Ok(());
        };

        self.state = SyncState::Loading;
        info!("event=sync_start module=sync status=start principal={}", config.principal);

        let rows = match remote.fetch_all(&config.principal) {
            Ok(rows) => rows,
            Err(err) => {
                error!("event=sync_start module=sync status=error stage=pull error={err}");
                self.state = SyncState::Failed(err.clone());
                return Err(err);
            }
        };
        let subscription = match remote.subscribe() {
            Ok(subscription) => subscription,
            Err(err) => {
                error!("event=sync_start module=sync status=error stage=subscribe error={err}");
                self.state = SyncState::Failed(err.clone());
                return Err(err);
            }
        };

        let pulled = rows.len();
        repo.replace_all(rows);
        self.subscription = Some(subscription);
        self.pending_echo.clear();
        if let Ok(mut queue) = self.outbound.lock() {
            queue.clear();
        }
        self.state = SyncState::Live;
        info!("event=sync_start module=sync status=ok pulled={pulled}");
        Ok(())
    }

    /// Drains pending realtime events into the repository.
    ///
    /// Events for ids holding an echo credit consume one credit and are
    /// skipped: they are the replica reflecting this session's own publish.
    /// Returns the number of events applied.
    pub fn pump(&mut self, repo: &mut ItemRepository) -> usize {
        let Some(subscription) = self.subscription.as_mut() else {
            return 0;
        };

        let mut applied = 0;
        while let Some(event) = subscription.try_next() {
            let id = event.item_id();
            if let Some(credits) = self.pending_echo.get_mut(&id) {
                *credits -= 1;
                if *credits == 0 {
                    self.pending_echo.remove(&id);
                }
                continue;
            }
            match event {
                RemoteEvent::Inserted(row) => repo.apply_remote_insert(row),
                RemoteEvent::Updated(row) => repo.apply_remote_update(row),
                RemoteEvent::Deleted(id) => repo.apply_remote_delete(id),
            }
            applied += 1;
        }
        applied
    }

    /// Publishes queued local changes. Returns the number published.
    ///
    /// Each success registers one echo credit for the item. Failures are
    /// logged and the change dropped; the local write stands and the next
    /// successful sync reconciles the drift.
    pub fn flush_outbound(&mut self) -> usize {
        let Some(remote) = self.remote.clone() else {
            return 0;
        };
        if self.state != SyncState::Live {
            return 0;
        }

        let drained: Vec<OutboundChange> = match self.outbound.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => {
                error!("event=sync_publish module=sync status=error error_code=queue_poisoned");
                return 0;
            }
        };

        let mut published = 0;
        for change in drained {
            let id = change.item_id();
            match remote.publish(&change) {
                Ok(()) => {
                    *self.pending_echo.entry(id).or_insert(0) += 1;
                    published += 1;
                }
                Err(err) => {
                    warn!(
                        "event=sync_publish module=sync status=error item_id={id} retryable={} error={err}",
                        err.retryable
                    );
                }
            }
        }
        published
    }

    /// Tears the subscription down when the owning session ends. The
    /// reconciler reads as `Disabled` afterwards; `start` brings it back.
    pub fn stop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
        if self.state != SyncState::Disabled {
            info!("event=sync_stop module=sync status=ok");
            self.state = SyncState::Disabled;
        }
    }
}

//! Command surface over the item store.
//!
//! # Responsibility
//! - Wire repository, audit recorder, relation graph, and reconciler
//!   together at construction (explicit observer registration, no ambient
//!   globals).
//! - Expose the full command set: item CRUD, reorder, projections, chains,
//!   audit reads, purge, snapshot persist/load, and sync control.
//!
//! # Invariants
//! - The recorder and the outbound collector are the only repository
//!   observers and are registered exactly once, at construction.
//! - Chain reads filter dangling and tombstoned endpoints here, at read
//!   time; the graph itself never blocks item deletion.
//! - Purge chains the relation orphan prune over every physically present
//!   id, tombstones included.

use crate::clock::Clock;
use crate::model::activity::{ActivityAction, ActivityEntry};
use crate::model::hub::Hub;
use crate::model::item::{
    HubId, Item, ItemDraft, ItemId, ItemPatch, ItemValidationError,
};
use crate::model::relation::{Relation, RelationId, RelationKind};
use crate::repo::activity_log::ActivityRecorder;
use crate::repo::item_repo::{ItemRepository, MutationObserver, StatusFilter};
use crate::repo::relation_graph::{RelationError, RelationGraph, RelationView};
use crate::repo::snapshot_repo::{SnapshotResult, SnapshotStore};
use crate::sync::reconciler::{SyncReconciler, SyncState};
use crate::sync::remote::RemoteError;
use log::info;
use std::collections::HashSet;
use std::sync::Arc;

/// Facade over one isolated store instance.
///
/// Instances are explicitly constructed and independent; tests hold several
/// side by side.
pub struct StoreService {
    repo: ItemRepository,
    recorder: Arc<ActivityRecorder>,
    graph: RelationGraph,
    reconciler: SyncReconciler,
    hubs: Vec<Hub>,
}

impl StoreService {
    /// Builds a store wired to the given reconciler.
    pub fn new(clock: Arc<dyn Clock>, reconciler: SyncReconciler) -> Self {
        let mut repo = ItemRepository::new(Arc::clone(&clock));
        let recorder = Arc::new(ActivityRecorder::new(Arc::clone(&clock)));
        repo.register_observer(Arc::clone(&recorder) as Arc<dyn MutationObserver>);
        if let Some(collector) = reconciler.collector() {
            repo.register_observer(collector as Arc<dyn MutationObserver>);
        }

        Self {
            repo,
            recorder,
            graph: RelationGraph::new(clock),
            reconciler,
            hubs: Vec::new(),
        }
    }

    /// Builds a local-only store with sync disabled.
    pub fn local(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, SyncReconciler::disabled())
    }

    // --- items ---

    pub fn insert(&mut self, draft: ItemDraft) -> Result<Item, ItemValidationError> {
        self.repo.insert(draft)
    }

    pub fn update(&mut self, id: ItemId, patch: &ItemPatch) -> Result<(), ItemValidationError> {
        self.repo.update(id, patch)
    }

    pub fn soft_delete(&mut self, id: ItemId) {
        self.repo.soft_delete(id);
    }

    pub fn restore(&mut self, id: ItemId) {
        self.repo.restore(id);
    }

    pub fn reorder(&mut self, id: ItemId, before: Option<ItemId>, after: Option<ItemId>) {
        self.repo.reorder(id, before, after);
    }

    pub fn by_status(&self, filter: StatusFilter) -> Vec<Item> {
        self.repo.by_status(filter)
    }

    pub fn by_hub(&self, hub_id: HubId) -> Vec<Item> {
        self.repo.by_hub(hub_id)
    }

    /// Direct lookup; returns tombstoned items until purge removes them.
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.repo.get(id)
    }

    /// Removes expired tombstones, then prunes relations that reference ids
    /// no longer physically present.
    pub fn purge_expired(&mut self) -> usize {
        let purged = self.repo.purge_expired();
        let live_ids: HashSet<ItemId> = self.repo.rows().iter().map(|item| item.id).collect();
        let pruned = self.graph.prune_orphans(&live_ids);
        if purged > 0 || pruned > 0 {
            info!(
                "event=purge_sweep module=service status=ok purged={purged} pruned_relations={pruned}"
            );
        }
        purged
    }

    // --- chains ---

    /// Links two items and audits both endpoints' timelines. An existing
    /// unordered pair is returned unchanged without a new audit entry.
    pub fn link(
        &mut self,
        source_id: ItemId,
        target_id: ItemId,
        kind: RelationKind,
    ) -> Result<Relation, RelationError> {
        let outcome = self.graph.link(source_id, target_id, kind)?;
        if outcome.created {
            for endpoint in [source_id, target_id] {
                self.recorder.record(
                    endpoint,
                    ActivityAction::ChainAdded,
                    None,
                    Some(outcome.relation.kind_for(endpoint).as_str().to_string()),
                );
            }
        }
        Ok(outcome.relation)
    }

    /// Unlinks by relation id; unknown ids are a silent no-op.
    pub fn unlink(&mut self, relation_id: RelationId) {
        let Some(relation) = self.graph.unlink(relation_id) else {
            return;
        };
        for endpoint in [relation.source_id, relation.target_id] {
            self.recorder.record(
                endpoint,
                ActivityAction::ChainRemoved,
                Some(relation.kind_for(endpoint).as_str().to_string()),
                None,
            );
        }
    }

    /// Perspective-adjusted chains whose other endpoint still resolves to a
    /// live item. Dangling and tombstoned endpoints are filtered here.
    pub fn relations_of(&self, item_id: ItemId) -> Vec<RelationView> {
        self.graph
            .relations_of(item_id)
            .into_iter()
            .filter(|view| {
                self.repo
                    .get(view.other_id)
                    .is_some_and(|item| item.is_active())
            })
            .collect()
    }

    // --- activity ---

    pub fn entries_for(&self, item_id: ItemId) -> Vec<ActivityEntry> {
        self.recorder.entries_for(item_id)
    }

    pub fn recent_activity(&self, limit: usize) -> Vec<ActivityEntry> {
        self.recorder.recent(limit)
    }

    // --- hubs (externally owned roster) ---

    pub fn hubs(&self) -> &[Hub] {
        &self.hubs
    }

    pub fn set_hubs(&mut self, hubs: Vec<Hub>) {
        self.hubs = hubs;
    }

    pub fn hub(&self, id: HubId) -> Option<&Hub> {
        self.hubs.iter().find(|hub| hub.id == id)
    }

    // --- snapshots ---

    /// Persists every collection as its serialized blob, tombstones and all.
    pub fn persist(&self, store: &SnapshotStore) -> SnapshotResult<()> {
        store.save_items(self.repo.rows())?;
        store.save_relations(&self.graph.snapshot())?;
        store.save_activity(&self.recorder.snapshot())?;
        store.save_hubs(&self.hubs)?;
        Ok(())
    }

    /// Reloads every collection exactly as persisted; nothing is re-derived.
    pub fn load(&mut self, store: &SnapshotStore) -> SnapshotResult<()> {
        self.repo.replace_all(store.load_items()?);
        self.graph.restore(store.load_relations()?);
        self.recorder.restore(store.load_activity()?);
        self.hubs = store.load_hubs()?;
        Ok(())
    }

    // --- sync ---

    pub fn start_sync(&mut self) -> Result<(), RemoteError> {
        self.reconciler.start(&mut self.repo)
    }

    /// Applies pending realtime events; returns how many applied.
    pub fn pump_sync(&mut self) -> usize {
        self.reconciler.pump(&mut self.repo)
    }

    /// Publishes queued local changes; returns how many published.
    pub fn flush_outbound(&mut self) -> usize {
        self.reconciler.flush_outbound()
    }

    pub fn sync_state(&self) -> &SyncState {
        self.reconciler.state()
    }

    pub fn stop_sync(&mut self) {
        self.reconciler.stop();
    }
}

//! Canonical item collection.
//!
//! # Responsibility
//! - Own item identity, lifecycle, and relative ordering.
//! - Notify registered observers after every mutation with origin-tagged
//!   before/after payloads.
//! - Apply remote-origin changes without re-triggering local publication.
//!
//! # Invariants
//! - Unknown ids are silent no-ops: callers race with deletion and treat
//!   every operation as an idempotent best-effort command.
//! - Tombstoned items accept no field edits other than deletion restore.
//! - `completed_at` tracks `status == Done` on every transition.
//! - Projections exclude tombstones; direct lookup does not.

use crate::clock::Clock;
use crate::model::body::derive_body_text;
use crate::model::item::{
    normalize_tags, HubId, Item, ItemDraft, ItemId, ItemPatch, ItemStatus, ItemValidationError,
    Priority,
};
use crate::order;
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

/// Which event source produced a mutation.
///
/// Remote-origin mutations must not be published back to the remote; the
/// origin tag carries that through the observer chain instead of a shared
/// suppression flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOrigin {
    Local,
    Remote,
}

/// Mutation payload delivered to observers.
#[derive(Debug, Clone)]
pub enum MutationKind {
    Inserted(Item),
    Updated { before: Item, after: Item },
    SoftDeleted(Item),
    Removed(ItemId),
}

/// One observed repository mutation.
#[derive(Debug, Clone)]
pub struct MutationEvent {
    pub origin: MutationOrigin,
    pub kind: MutationKind,
}

/// Observer registered at construction time.
///
/// Observers are fire-and-forget: they must swallow their own failures and
/// must never block the mutation they observe.
pub trait MutationObserver {
    fn on_mutation(&self, event: &MutationEvent);
}

/// Status projection filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Inbox,
    /// `todo` and `in_progress` together.
    Active,
    Done,
    All,
}

impl StatusFilter {
    fn matches(self, status: ItemStatus) -> bool {
        match self {
            Self::Inbox => status == ItemStatus::Inbox,
            Self::Active => matches!(status, ItemStatus::Todo | ItemStatus::InProgress),
            Self::Done => status == ItemStatus::Done,
            Self::All => true,
        }
    }
}

/// In-memory canonical collection of items.
pub struct ItemRepository {
    items: Vec<Item>,
    observers: Vec<Arc<dyn MutationObserver>>,
    clock: Arc<dyn Clock>,
}

impl ItemRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            items: Vec::new(),
            observers: Vec::new(),
            clock,
        }
    }

    /// Registers a mutation observer. Registration order is notification
    /// order.
    pub fn register_observer(&mut self, observer: Arc<dyn MutationObserver>) {
        self.observers.push(observer);
    }

    /// Creates an item from a draft. New items are prepended: the order key
    /// is allocated before the current head of the active collection.
    pub fn insert(&mut self, draft: ItemDraft) -> Result<Item, ItemValidationError> {
        if draft.title.trim().is_empty() {
            return Err(ItemValidationError::EmptyTitle);
        }

        let now = self.clock.now_ms();
        let status = draft.status.unwrap_or(ItemStatus::Inbox);
        let body = draft.body.unwrap_or(serde_json::Value::Null);
        let item = Item {
            id: Uuid::new_v4(),
            title: draft.title,
            body_text: derive_body_text(&body),
            body,
            status,
            priority: draft.priority.unwrap_or(Priority::None),
            tags: normalize_tags(&draft.tags),
            hub_id: draft.hub_id,
            order_key: order::allocate(None, self.min_active_key()),
            created_at: now,
            updated_at: now,
            completed_at: (status == ItemStatus::Done).then_some(now),
            deleted_at: None,
        };

        self.items.insert(0, item.clone());
        self.notify(MutationEvent {
            origin: MutationOrigin::Local,
            kind: MutationKind::Inserted(item.clone()),
        });
        Ok(item)
    }

    /// Merges a partial patch into an existing item.
    ///
    /// Unknown ids are a silent no-op. Tombstoned items only accept patches
    /// carrying `restore_deleted`; the restore applies together with any
    /// other fields in the same patch.
    pub fn update(&mut self, id: ItemId, patch: &ItemPatch) -> Result<(), ItemValidationError> {
        if let Some(title) = patch.title.as_deref() {
            if title.trim().is_empty() {
                return Err(ItemValidationError::EmptyTitle);
            }
        }

        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return Ok(());
        };
        if self.items[index].is_tombstoned() && !patch.restore_deleted {
            return Ok(());
        }

        let before = self.items[index].clone();
        let now = self.clock.now_ms();
        let item = &mut self.items[index];
        if patch.restore_deleted {
            item.deleted_at = None;
        }
        if let Some(title) = &patch.title {
            item.title = title.clone();
        }
        if let Some(body) = &patch.body {
            item.body_text = derive_body_text(body);
            item.body = body.clone();
        }
        if let Some(priority) = patch.priority {
            item.priority = priority;
        }
        if let Some(tags) = &patch.tags {
            item.tags = normalize_tags(tags);
        }
        if let Some(hub_id) = patch.hub_id {
            item.hub_id = hub_id;
        }
        if let Some(status) = patch.status {
            // Re-asserting the current status must not move completed_at.
            if status != item.status {
                item.status = status;
                item.completed_at = (status == ItemStatus::Done).then_some(now);
            }
        }
        item.updated_at = now;

        let after = item.clone();
        self.notify(MutationEvent {
            origin: MutationOrigin::Local,
            kind: MutationKind::Updated { before, after },
        });
        Ok(())
    }

    /// Stamps the tombstone. Order key and relations are left untouched so
    /// a restore before purge brings the item back in place.
    pub fn soft_delete(&mut self, id: ItemId) {
        let now = self.clock.now_ms();
        let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.id == id && item.is_active())
        else {
            return;
        };
        item.deleted_at = Some(now);
        let after = item.clone();
        self.notify(MutationEvent {
            origin: MutationOrigin::Local,
            kind: MutationKind::SoftDeleted(after),
        });
    }

    /// Clears a tombstone through the regular update path.
    pub fn restore(&mut self, id: ItemId) {
        // Restore patches cannot fail validation.
        let _ = self.update(id, &ItemPatch::restore());
    }

    /// Physically removes tombstones older than the retention window.
    ///
    /// Advisory and idempotent; safe to call repeatedly. Observers are not
    /// notified: purge only drops rows already invisible to every projection
    /// and is never mirrored to the remote.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before_len = self.items.len();
        self.items.retain(|item| !item.is_purge_due(now));
        before_len - self.items.len()
    }

    /// Moves an item between the two surviving neighbors at the drop
    /// position of the caller's filtered view.
    ///
    /// Position is not a tracked field: observers see an update whose only
    /// changed column is the order key, which publishes to the remote but
    /// records no audit entry. When the neighbor gap is exhausted the whole
    /// live collection is renumbered first, preserving observable order.
    pub fn reorder(&mut self, id: ItemId, before: Option<ItemId>, after: Option<ItemId>) {
        if !self
            .items
            .iter()
            .any(|item| item.id == id && item.is_active())
        {
            return;
        }

        let mut before_key = self.active_key_of(before);
        let mut after_key = self.active_key_of(after);
        if order::gap_exhausted(before_key, after_key) {
            self.renumber_live();
            before_key = self.active_key_of(before);
            after_key = self.active_key_of(after);
        }
        let new_key = order::allocate(before_key, after_key);

        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return;
        };
        let before_item = self.items[index].clone();
        self.items[index].order_key = new_key;
        self.items[index].updated_at = self.clock.now_ms();
        let after_item = self.items[index].clone();
        self.notify(MutationEvent {
            origin: MutationOrigin::Local,
            kind: MutationKind::Updated {
                before: before_item,
                after: after_item,
            },
        });
    }

    /// Non-tombstoned items for a status filter.
    ///
    /// Sorted ascending by order key, except `Done`, which lists the most
    /// recently finished first.
    pub fn by_status(&self, filter: StatusFilter) -> Vec<Item> {
        let mut rows: Vec<Item> = self
            .items
            .iter()
            .filter(|item| item.is_active() && filter.matches(item.status))
            .cloned()
            .collect();
        if filter == StatusFilter::Done {
            rows.sort_by(|a, b| {
                b.completed_at
                    .unwrap_or(i64::MIN)
                    .cmp(&a.completed_at.unwrap_or(i64::MIN))
                    .then_with(|| a.id.cmp(&b.id))
            });
        } else {
            sort_by_order_key(&mut rows);
        }
        rows
    }

    /// Non-tombstoned items assigned to a hub, ascending by order key.
    pub fn by_hub(&self, hub_id: HubId) -> Vec<Item> {
        let mut rows: Vec<Item> = self
            .items
            .iter()
            .filter(|item| item.is_active() && item.hub_id == Some(hub_id))
            .cloned()
            .collect();
        sort_by_order_key(&mut rows);
        rows
    }

    /// Direct lookup. Tombstoned items stay retrievable here until purge.
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Every physically present row, tombstones included. Snapshot and
    /// orphan-pruning input.
    pub fn rows(&self) -> &[Item] {
        &self.items
    }

    /// Wholesale replacement from a snapshot load or a remote bulk pull.
    /// Emits no observer events.
    pub fn replace_all(&mut self, rows: Vec<Item>) {
        self.items = rows;
    }

    /// Remote-origin creation: prepended if the id is not already present
    /// (an out-of-band creation from another device), otherwise a no-op.
    pub fn apply_remote_insert(&mut self, row: Item) {
        if self.items.iter().any(|item| item.id == row.id) {
            return;
        }
        self.items.insert(0, row.clone());
        self.notify(MutationEvent {
            origin: MutationOrigin::Remote,
            kind: MutationKind::Inserted(row),
        });
    }

    /// Remote-origin update: the remote row fully supersedes the local one
    /// (last-writer-wins at row granularity). No-op for unknown ids.
    pub fn apply_remote_update(&mut self, row: Item) {
        let Some(index) = self.items.iter().position(|item| item.id == row.id) else {
            return;
        };
        let before = std::mem::replace(&mut self.items[index], row.clone());
        self.notify(MutationEvent {
            origin: MutationOrigin::Remote,
            kind: MutationKind::Updated { before, after: row },
        });
    }

    /// Remote-origin deletion: immediate physical removal, bypassing the
    /// local tombstone-and-purge flow. The remote has already deleted it.
    pub fn apply_remote_delete(&mut self, id: ItemId) {
        let before_len = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() != before_len {
            self.notify(MutationEvent {
                origin: MutationOrigin::Remote,
                kind: MutationKind::Removed(id),
            });
        }
    }

    fn notify(&self, event: MutationEvent) {
        for observer in &self.observers {
            observer.on_mutation(&event);
        }
    }

    fn min_active_key(&self) -> Option<f64> {
        self.items
            .iter()
            .filter(|item| item.is_active())
            .map(|item| item.order_key)
            .fold(None, |min, key| match min {
                Some(current) if current <= key => Some(current),
                _ => Some(key),
            })
    }

    fn active_key_of(&self, id: Option<ItemId>) -> Option<f64> {
        id.and_then(|id| {
            self.items
                .iter()
                .find(|item| item.id == id && item.is_active())
        })
        .map(|item| item.order_key)
    }

    /// Assigns dense `KEY_GAP` multiples across every live item in current
    /// key order. Relative order is preserved in every partition, since a
    /// partition's order is induced by the global key order. Key changes are
    /// published like any other update so replicas converge.
    fn renumber_live(&mut self) {
        let mut live: Vec<usize> = (0..self.items.len())
            .filter(|&index| self.items[index].is_active())
            .collect();
        live.sort_by(|&a, &b| {
            self.items[a]
                .order_key
                .partial_cmp(&self.items[b].order_key)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.items[a].id.cmp(&self.items[b].id))
        });

        let keys = order::renumbered(live.len());
        let mut changes = Vec::new();
        for (slot, index) in live.into_iter().enumerate() {
            if self.items[index].order_key != keys[slot] {
                let before = self.items[index].clone();
                self.items[index].order_key = keys[slot];
                changes.push((before, self.items[index].clone()));
            }
        }
        for (before, after) in changes {
            self.notify(MutationEvent {
                origin: MutationOrigin::Local,
                kind: MutationKind::Updated { before, after },
            });
        }
    }
}

fn sort_by_order_key(rows: &mut [Item]) {
    rows.sort_by(|a, b| {
        a.order_key
            .partial_cmp(&b.order_key)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

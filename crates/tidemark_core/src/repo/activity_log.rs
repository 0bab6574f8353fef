//! Capped audit trail of item field transitions.
//!
//! # Responsibility
//! - Observe repository mutations and derive one entry per changed tracked
//!   field (status, priority, hub, title).
//! - Keep at most the 500 most recent entries globally.
//!
//! # Invariants
//! - Appending never blocks or fails the mutation being observed; internal
//!   errors are swallowed and logged.
//! - Remote-origin mutations are not recorded; the audit trail is local.
//! - Overflow silently drops the oldest entry.

use crate::clock::Clock;
use crate::model::activity::{ActivityAction, ActivityEntry};
use crate::model::item::{Item, ItemId};
use crate::repo::item_repo::{MutationEvent, MutationKind, MutationObserver, MutationOrigin};
use log::error;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Global entry cap. The 501st entry evicts the oldest.
pub const ACTIVITY_CAP: usize = 500;

/// Append-only recorder registered as a repository observer.
pub struct ActivityRecorder {
    clock: Arc<dyn Clock>,
    entries: Mutex<VecDeque<ActivityEntry>>,
}

impl ActivityRecorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends one entry, enforcing the cap.
    ///
    /// Fire-and-forget: a poisoned log is reported and the append dropped;
    /// the caller's mutation proceeds untouched.
    pub fn record(
        &self,
        item_id: ItemId,
        action: ActivityAction,
        from: Option<String>,
        to: Option<String>,
    ) {
        let entry = ActivityEntry {
            id: Uuid::new_v4(),
            item_id,
            action,
            from,
            to,
            created_at: self.clock.now_ms(),
        };
        let Ok(mut entries) = self.entries.lock() else {
            error!("event=activity_append module=activity status=error error_code=log_poisoned");
            return;
        };
        entries.push_back(entry);
        while entries.len() > ACTIVITY_CAP {
            entries.pop_front();
        }
    }

    /// Entries for one item, most recent first.
    pub fn entries_for(&self, item_id: ItemId) -> Vec<ActivityEntry> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        entries
            .iter()
            .rev()
            .filter(|entry| entry.item_id == item_id)
            .cloned()
            .collect()
    }

    /// Global feed, most recent first, capped at `limit`.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Oldest-first copy for snapshot persistence.
    pub fn snapshot(&self) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .map_or_else(|_| Vec::new(), |entries| entries.iter().cloned().collect())
    }

    /// Replaces the log from a snapshot, re-applying the cap.
    pub fn restore(&self, entries: Vec<ActivityEntry>) {
        let Ok(mut current) = self.entries.lock() else {
            error!("event=activity_restore module=activity status=error error_code=log_poisoned");
            return;
        };
        *current = entries.into_iter().collect();
        while current.len() > ACTIVITY_CAP {
            current.pop_front();
        }
    }

    fn record_update_diffs(&self, before: &Item, after: &Item) {
        if before.status != after.status {
            self.record(
                after.id,
                ActivityAction::StatusChanged,
                Some(before.status.as_str().to_string()),
                Some(after.status.as_str().to_string()),
            );
        }
        if before.priority != after.priority {
            self.record(
                after.id,
                ActivityAction::PriorityChanged,
                Some(before.priority.as_str().to_string()),
                Some(after.priority.as_str().to_string()),
            );
        }
        if before.hub_id != after.hub_id {
            match after.hub_id {
                Some(hub_id) => self.record(
                    after.id,
                    ActivityAction::HubAssigned,
                    before.hub_id.map(|id| id.to_string()),
                    Some(hub_id.to_string()),
                ),
                None => self.record(
                    after.id,
                    ActivityAction::HubRemoved,
                    before.hub_id.map(|id| id.to_string()),
                    None,
                ),
            }
        }
        if before.title != after.title {
            self.record(
                after.id,
                ActivityAction::TitleChanged,
                Some(before.title.clone()),
                Some(after.title.clone()),
            );
        }
    }
}

impl MutationObserver for ActivityRecorder {
    fn on_mutation(&self, event: &MutationEvent) {
        if event.origin == MutationOrigin::Remote {
            return;
        }
        match &event.kind {
            MutationKind::Inserted(item) => {
                self.record(item.id, ActivityAction::Created, None, None);
            }
            MutationKind::Updated { before, after } => {
                self.record_update_diffs(before, after);
            }
            // Deletion carries no action tag; the tombstone itself is the
            // record until purge.
            MutationKind::SoftDeleted(_) | MutationKind::Removed(_) => {}
        }
    }
}

//! Audit trail records.
//!
//! # Responsibility
//! - Define the append-only field-transition entry shape.
//!
//! # Invariants
//! - Entries are immutable once appended.
//! - `from`/`to` are display values; absence means the action carries none.

use crate::model::item::ItemId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for audit entries.
pub type EntryId = Uuid;

/// Field transition or lifecycle event recorded for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    StatusChanged,
    PriorityChanged,
    HubAssigned,
    HubRemoved,
    TitleChanged,
    ChainAdded,
    ChainRemoved,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusChanged => "status_changed",
            Self::PriorityChanged => "priority_changed",
            Self::HubAssigned => "hub_assigned",
            Self::HubRemoved => "hub_removed",
            Self::TitleChanged => "title_changed",
            Self::ChainAdded => "chain_added",
            Self::ChainRemoved => "chain_removed",
        }
    }
}

/// One immutable audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: EntryId,
    pub item_id: ItemId,
    pub action: ActivityAction,
    pub from: Option<String>,
    pub to: Option<String>,
    pub created_at: i64,
}

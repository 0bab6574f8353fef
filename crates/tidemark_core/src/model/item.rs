//! Item record and its write-side input shapes.
//!
//! # Responsibility
//! - Define the canonical item row shared by projections, snapshots, and the
//!   remote wire contract.
//! - Provide draft/patch input types and tag normalization.
//!
//! # Invariants
//! - `completed_at` is non-null iff `status == Done`.
//! - Non-null `deleted_at` marks a tombstone; tombstones stay physically
//!   present until the purge sweep removes them.
//! - `tags` are trimmed, case-folded, and deduplicated before storage.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for items.
pub type ItemId = Uuid;

/// Stable identifier for externally owned hubs.
pub type HubId = Uuid;

/// Tombstone retention window before physical removal: 7 days.
pub const RETENTION_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Workflow state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Inbox,
    Todo,
    InProgress,
    Done,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

/// Item priority. `None` is the default, not the absence of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    None,
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Canonical item row.
///
/// `body` is an opaque structured payload; `body_text` is its derived
/// plain-text projection and is persisted alongside it so reloads never
/// re-derive anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub body: Value,
    pub body_text: String,
    pub status: ItemStatus,
    pub priority: Priority,
    pub tags: BTreeSet<String>,
    pub hub_id: Option<HubId>,
    /// Relative position within the item's status/hub partition.
    pub order_key: f64,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
    pub deleted_at: Option<i64>,
}

impl Item {
    /// Whether the item participates in projections.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Whether the item is a tombstone awaiting purge.
    pub fn is_tombstoned(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether the tombstone has outlived the retention window at `now_ms`.
    pub fn is_purge_due(&self, now_ms: i64) -> bool {
        self.deleted_at
            .is_some_and(|deleted_at| now_ms - deleted_at > RETENTION_MS)
    }
}

/// Validation failure for item write inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    EmptyTitle,
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "item title must not be empty"),
        }
    }
}

impl Error for ItemValidationError {}

/// Input shape for creating an item.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub title: String,
    pub body: Option<Value>,
    pub status: Option<ItemStatus>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub hub_id: Option<HubId>,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial field merge for updating an item.
///
/// `hub_id` is doubly optional: the outer `None` leaves the assignment
/// untouched, `Some(None)` clears it. `restore_deleted` is the only edit a
/// tombstoned item accepts.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub body: Option<Value>,
    pub status: Option<ItemStatus>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub hub_id: Option<Option<HubId>>,
    pub restore_deleted: bool,
}

impl ItemPatch {
    /// Patch that only clears the tombstone.
    pub fn restore() -> Self {
        Self {
            restore_deleted: true,
            ..Self::default()
        }
    }

    pub fn with_status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Normalizes one tag value: trimmed, case-folded, empty dropped.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates a tag list into the stored set shape.
pub fn normalize_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .filter_map(|tag| normalize_tag(tag))
        .collect()
}

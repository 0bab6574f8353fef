//! Typed relations ("chains") between two items.
//!
//! # Responsibility
//! - Define the stored relation record and the perspective flip applied when
//!   a relation is read from its target endpoint.
//!
//! # Invariants
//! - A stored relation keeps the direction it was created with.
//! - `parent`/`child` and `blocks`/`blocked_by` invert under perspective;
//!   `related` is symmetric.

use crate::model::item::ItemId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for relations.
pub type RelationId = Uuid;

/// Relation semantics as stored from the source endpoint's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Related,
    Parent,
    Child,
    Blocks,
    BlockedBy,
}

impl RelationKind {
    /// The kind as seen from the opposite endpoint.
    pub fn flipped(self) -> Self {
        match self {
            Self::Related => Self::Related,
            Self::Parent => Self::Child,
            Self::Child => Self::Parent,
            Self::Blocks => Self::BlockedBy,
            Self::BlockedBy => Self::Blocks,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Related => "related",
            Self::Parent => "parent",
            Self::Child => "child",
            Self::Blocks => "blocks",
            Self::BlockedBy => "blocked_by",
        }
    }
}

/// Stored directional relation between two items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub source_id: ItemId,
    pub target_id: ItemId,
    pub kind: RelationKind,
    pub created_at: i64,
}

impl Relation {
    /// Whether this relation joins the unordered pair `{a, b}`.
    pub fn joins(&self, a: ItemId, b: ItemId) -> bool {
        (self.source_id == a && self.target_id == b)
            || (self.source_id == b && self.target_id == a)
    }

    /// The endpoint opposite to `viewer`, if `viewer` is an endpoint.
    pub fn other_endpoint(&self, viewer: ItemId) -> Option<ItemId> {
        if self.source_id == viewer {
            Some(self.target_id)
        } else if self.target_id == viewer {
            Some(self.source_id)
        } else {
            None
        }
    }

    /// The kind as seen by `viewer`: stored kind from the source side,
    /// flipped from the target side.
    pub fn kind_for(&self, viewer: ItemId) -> RelationKind {
        if self.target_id == viewer {
            self.kind.flipped()
        } else {
            self.kind
        }
    }
}

//! Undirected relation graph between item ids.
//!
//! # Responsibility
//! - Store typed, directional relations deduplicated per unordered pair.
//! - Present the perspective-adjusted view for either endpoint.
//! - Prune relations whose endpoints no longer physically exist.
//!
//! # Invariants
//! - At most one relation exists per unordered pair, whichever direction was
//!   requested later.
//! - Stored direction is never overwritten; re-kinding requires an explicit
//!   unlink followed by a new link.
//! - The graph holds ids only and never blocks item deletion; dangling ids
//!   are filtered by readers, not here.

use crate::clock::Clock;
use crate::model::item::ItemId;
use crate::model::relation::{Relation, RelationId, RelationKind};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Validation failure for link requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationError {
    SelfLink(ItemId),
}

impl Display for RelationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfLink(id) => write!(f, "item cannot be chained to itself: {id}"),
        }
    }
}

impl Error for RelationError {}

/// Result of a link request: the surviving relation plus whether this call
/// created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub relation: Relation,
    pub created: bool,
}

/// Perspective-adjusted read row for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationView {
    pub relation: Relation,
    pub other_id: ItemId,
    /// Kind as seen from the queried endpoint.
    pub kind: RelationKind,
}

/// Relation storage, deduplicated per unordered endpoint pair.
pub struct RelationGraph {
    relations: Vec<Relation>,
    clock: Arc<dyn Clock>,
}

impl RelationGraph {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            relations: Vec::new(),
            clock,
        }
    }

    /// Links two items. If the unordered pair is already linked the existing
    /// relation is returned unchanged, whatever direction or kind was
    /// requested.
    pub fn link(
        &mut self,
        source_id: ItemId,
        target_id: ItemId,
        kind: RelationKind,
    ) -> Result<LinkOutcome, RelationError> {
        if source_id == target_id {
            return Err(RelationError::SelfLink(source_id));
        }
        if let Some(existing) = self
            .relations
            .iter()
            .find(|relation| relation.joins(source_id, target_id))
        {
            return Ok(LinkOutcome {
                relation: existing.clone(),
                created: false,
            });
        }

        let relation = Relation {
            id: Uuid::new_v4(),
            source_id,
            target_id,
            kind,
            created_at: self.clock.now_ms(),
        };
        self.relations.push(relation.clone());
        Ok(LinkOutcome {
            relation,
            created: true,
        })
    }

    /// Removes one relation. Unknown ids are a silent no-op; the removed
    /// relation is returned so callers can audit both endpoints.
    pub fn unlink(&mut self, relation_id: RelationId) -> Option<Relation> {
        let index = self
            .relations
            .iter()
            .position(|relation| relation.id == relation_id)?;
        Some(self.relations.remove(index))
    }

    /// Relations touching one endpoint, perspective-adjusted.
    ///
    /// Dangling or tombstoned other-endpoints are the reader's concern; this
    /// view reports raw membership.
    pub fn relations_of(&self, item_id: ItemId) -> Vec<RelationView> {
        self.relations
            .iter()
            .filter_map(|relation| {
                let other_id = relation.other_endpoint(item_id)?;
                Some(RelationView {
                    kind: relation.kind_for(item_id),
                    relation: relation.clone(),
                    other_id,
                })
            })
            .collect()
    }

    /// Drops relations referencing ids outside the live set. Invoked after
    /// a purge sweep with every physically present id (tombstones included,
    /// so pre-purge restores keep their chains).
    pub fn prune_orphans(&mut self, live_ids: &HashSet<ItemId>) -> usize {
        let before_len = self.relations.len();
        self.relations.retain(|relation| {
            live_ids.contains(&relation.source_id) && live_ids.contains(&relation.target_id)
        });
        before_len - self.relations.len()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Stored relations for snapshot persistence.
    pub fn snapshot(&self) -> Vec<Relation> {
        self.relations.clone()
    }

    /// Replaces storage from a snapshot.
    pub fn restore(&mut self, relations: Vec<Relation>) {
        self.relations = relations;
    }
}

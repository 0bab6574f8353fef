//! Remote replica SPI and wire shapes.
//!
//! # Responsibility
//! - Define the adapter contract a replica backend implements: bulk fetch,
//!   change publish, and the realtime subscription.
//! - Define the three wire event kinds and the outbound change shapes.
//!
//! # Invariants
//! - INSERT/UPDATE events carry the full serialized row; DELETE carries only
//!   the id. Outbound publishes mirror the same shapes.
//! - A replica delivers every committed row change on the subscription,
//!   including the publisher's own writes; the reconciler budgets one echo
//!   per successful publish.

use crate::model::item::{Item, ItemId};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Which replica operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Pull,
    Publish,
    Subscribe,
}

impl SyncStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Publish => "publish",
            Self::Subscribe => "subscribe",
        }
    }
}

/// Stable error envelope returned by replica adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub replica_id: String,
    pub stage: SyncStage,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl RemoteError {
    pub fn new(
        replica_id: impl Into<String>,
        stage: SyncStage,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            replica_id: replica_id.into(),
            stage,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "replica `{}` {} failed [{}]: {}",
            self.replica_id,
            self.stage.as_str(),
            self.code,
            self.message
        )
    }
}

impl Error for RemoteError {}

/// Realtime change delivered by the subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    Inserted(Item),
    Updated(Item),
    Deleted(ItemId),
}

impl RemoteEvent {
    pub fn item_id(&self) -> ItemId {
        match self {
            Self::Inserted(row) | Self::Updated(row) => row.id,
            Self::Deleted(id) => *id,
        }
    }
}

/// Outbound mirror of a local mutation.
///
/// A soft-delete publishes as an update carrying the `deleted_at` stamp, not
/// as a delete, so both sides apply the same retention window.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundChange {
    /// Full row for a local insert.
    Insert(Item),
    /// Changed columns only for a local update.
    Update { id: ItemId, fields: Map<String, Value> },
}

impl OutboundChange {
    pub fn item_id(&self) -> ItemId {
        match self {
            Self::Insert(row) => row.id,
            Self::Update { id, .. } => *id,
        }
    }
}

/// Non-blocking handle on the realtime feed.
///
/// Must be closed when the owning session ends so no event is delivered
/// into a store that no longer has a live identity.
pub trait RemoteSubscription {
    /// Next pending event, if one has arrived.
    fn try_next(&mut self) -> Option<RemoteEvent>;
    /// Tears the subscription down. Idempotent.
    fn close(&mut self);
}

/// Adapter contract for a replica backend.
pub trait RemoteReplica {
    fn replica_id(&self) -> &str;
    /// One ordered bulk fetch of the principal's collection.
    fn fetch_all(&self, principal: &str) -> RemoteResult<Vec<Item>>;
    /// Publishes one outbound change. Fire-and-forget from the mutator's
    /// perspective; failures are the caller's to log, never to roll back.
    fn publish(&self, change: &OutboundChange) -> RemoteResult<()>;
    /// Opens the single realtime subscription for the collection.
    fn subscribe(&self) -> RemoteResult<Box<dyn RemoteSubscription>>;
}

/// Columns of `after` whose serialized value differs from `before`.
///
/// Serialization of an item cannot realistically fail; if it ever does the
/// diff degrades to empty and the publish is skipped.
pub fn changed_fields(before: &Item, after: &Item) -> Map<String, Value> {
    let before = to_object(before);
    to_object(after)
        .into_iter()
        .filter(|(column, value)| before.get(column) != Some(value))
        .collect()
}

fn to_object(item: &Item) -> Map<String, Value> {
    match serde_json::to_value(item) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    }
}

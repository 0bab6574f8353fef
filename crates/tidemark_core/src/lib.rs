//! Local-first item store for Tidemark.
//! This crate is the single source of truth for store invariants.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod order;
pub mod repo;
pub mod service;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::activity::{ActivityAction, ActivityEntry, EntryId};
pub use model::hub::Hub;
pub use model::item::{
    HubId, Item, ItemDraft, ItemId, ItemPatch, ItemStatus, ItemValidationError, Priority,
    RETENTION_MS,
};
pub use model::relation::{Relation, RelationId, RelationKind};
pub use repo::activity_log::{ActivityRecorder, ACTIVITY_CAP};
pub use repo::item_repo::{
    ItemRepository, MutationEvent, MutationKind, MutationObserver, MutationOrigin, StatusFilter,
};
pub use repo::relation_graph::{LinkOutcome, RelationError, RelationGraph, RelationView};
pub use repo::snapshot_repo::{SnapshotError, SnapshotResult, SnapshotStore};
pub use service::store_service::StoreService;
pub use sync::config::{SyncConfig, SyncConfigError};
pub use sync::reconciler::{SyncReconciler, SyncState};
pub use sync::remote::{
    OutboundChange, RemoteError, RemoteEvent, RemoteReplica, RemoteResult, RemoteSubscription,
    SyncStage,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

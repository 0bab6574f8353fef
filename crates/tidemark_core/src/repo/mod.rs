//! Store layer: canonical collections and their persistence.
//!
//! # Responsibility
//! - Own item identity and lifecycle (`item_repo`).
//! - Keep the capped audit log (`activity_log`) and the relation graph
//!   (`relation_graph`) as weak-reference observers of item ids.
//! - Persist/reload collection snapshots (`snapshot_repo`).
//!
//! # Invariants
//! - Only `item_repo` creates or destroys items; the other stores hold ids
//!   and tolerate dangling ones.
//! - Mutation observers are fire-and-forget; a failing observer never fails
//!   the mutation that triggered it.

pub mod activity_log;
pub mod item_repo;
pub mod relation_graph;
pub mod snapshot_repo;

//! Remote replica reconciliation.
//!
//! # Responsibility
//! - Define the replica SPI (`remote`) and its configuration (`config`).
//! - Reconcile local optimistic writes against the realtime change feed
//!   (`reconciler`) without duplicate application or feedback loops.
//!
//! # Invariants
//! - With no configured replica, local operations behave identically and no
//!   remote call is made.
//! - Remote failures never corrupt or roll back local state.

pub mod config;
pub mod reconciler;
pub mod remote;

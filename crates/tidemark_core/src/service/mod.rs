//! Store use-case services.
//!
//! # Responsibility
//! - Orchestrate the item repository, audit log, relation graph, snapshot
//!   persistence, and sync reconciler behind the command surface consumed by
//!   UI/CLI callers.
//! - Keep callers decoupled from observer wiring and storage details.

pub mod store_service;

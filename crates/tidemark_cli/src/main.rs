//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tidemark_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use std::sync::Arc;
use tidemark_core::{ItemDraft, StatusFilter, StoreService, SystemClock};

fn main() {
    println!("tidemark_core version={}", tidemark_core::core_version());

    let mut store = StoreService::local(Arc::new(SystemClock));
    if store.insert(ItemDraft::new("smoke check")).is_ok() {
        println!(
            "tidemark_core inbox={} activity={}",
            store.by_status(StatusFilter::Inbox).len(),
            store.recent_activity(10).len()
        );
    }
}

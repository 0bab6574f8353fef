//! Hub roster record.
//!
//! Hubs (project groupings) are owned outside the core store. The core keeps
//! the roster only so items can resolve their hub reference and so the
//! snapshot layer can persist the `hubs` collection.

use crate::model::item::HubId;
use serde::{Deserialize, Serialize};

/// Externally owned grouping an item may be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hub {
    pub id: HubId,
    pub name: String,
    pub created_at: i64,
}

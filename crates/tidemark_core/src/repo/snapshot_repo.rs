//! Snapshot persistence: one JSON blob per logical collection.
//!
//! # Responsibility
//! - Serialize each collection (items, relations, activity, hubs) as a JSON
//!   array and store it under its collection key.
//! - Reload collections exactly as persisted.
//!
//! # Invariants
//! - Derived fields are persisted inside the records; loads re-derive
//!   nothing.
//! - A missing collection loads as empty, not as an error.
//! - Saving a collection replaces its previous blob atomically.

use crate::db::DbError;
use crate::model::activity::ActivityEntry;
use crate::model::hub::Hub;
use crate::model::item::Item;
use crate::model::relation::Relation;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Snapshot persistence error.
#[derive(Debug)]
pub enum SnapshotError {
    Db(DbError),
    Serde(serde_json::Error),
    MissingRequiredTable(&'static str),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serde(err) => write!(f, "snapshot payload is not valid JSON: {err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "snapshot storage is missing required table `{table}`")
            }
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serde(err) => Some(err),
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for SnapshotError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SnapshotError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// Logical collection keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Items,
    Relations,
    Activity,
    Hubs,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Relations => "relations",
            Self::Activity => "activity",
            Self::Hubs => "hubs",
        }
    }
}

/// SQLite-backed snapshot store.
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Wraps a migrated/ready connection.
    pub fn try_new(conn: Connection) -> SnapshotResult<Self> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'snapshots'
            );",
            [],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(SnapshotError::MissingRequiredTable("snapshots"));
        }
        Ok(Self { conn })
    }

    pub fn save_items(&self, items: &[Item]) -> SnapshotResult<()> {
        self.save(Collection::Items, items)
    }

    pub fn load_items(&self) -> SnapshotResult<Vec<Item>> {
        self.load(Collection::Items)
    }

    pub fn save_relations(&self, relations: &[Relation]) -> SnapshotResult<()> {
        self.save(Collection::Relations, relations)
    }

    pub fn load_relations(&self) -> SnapshotResult<Vec<Relation>> {
        self.load(Collection::Relations)
    }

    pub fn save_activity(&self, entries: &[ActivityEntry]) -> SnapshotResult<()> {
        self.save(Collection::Activity, entries)
    }

    pub fn load_activity(&self) -> SnapshotResult<Vec<ActivityEntry>> {
        self.load(Collection::Activity)
    }

    pub fn save_hubs(&self, hubs: &[Hub]) -> SnapshotResult<()> {
        self.save(Collection::Hubs, hubs)
    }

    pub fn load_hubs(&self) -> SnapshotResult<Vec<Hub>> {
        self.load(Collection::Hubs)
    }

    fn save<T: Serialize>(&self, collection: Collection, records: &[T]) -> SnapshotResult<()> {
        let payload = serde_json::to_string(records)?;
        self.conn.execute(
            "INSERT INTO snapshots (collection, payload, saved_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(collection) DO UPDATE SET
                payload = excluded.payload,
                saved_at = excluded.saved_at;",
            params![collection.as_str(), payload],
        )?;
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, collection: Collection) -> SnapshotResult<Vec<T>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM snapshots WHERE collection = ?1;",
                [collection.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => Ok(Vec::new()),
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded entry database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `entries`: primary key `owner‖client_id` → serialized [`Entry`]
//! - `entries_by_owner_time`: `owner‖timestamp‖client_id` → primary key
//!
//! Both tables are created in [`RedbEntryStore::open`], so the index exists
//! before the first request is served. Every write touches the document and
//! its index entry inside one write transaction.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::keys::{index_key, owner_range, primary_key};
use super::{new_storage_id, EntryStore, StoreResult};
use crate::models::{Entry, EntryDraft};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: encoded (owner, client_id) → Entry JSON bytes.
const ENTRIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("entries");

/// Index: encoded (owner, timestamp, client_id) → primary key.
const ENTRIES_BY_OWNER_TIME: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("entries_by_owner_time");

// =============================================================================
// RedbEntryStore
// =============================================================================

/// Persistent [`EntryStore`].
///
/// redb calls block, so the async methods move them onto the blocking pool.
#[derive(Clone)]
pub struct RedbEntryStore {
    db: Arc<Database>,
}

impl RedbEntryStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ENTRIES)?;
            let _ = write_txn.open_table(ENTRIES_BY_OWNER_TIME)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Entry database opened");
        Ok(Self { db: Arc::new(db) })
    }

    fn list_blocking(&self, owner: &str) -> StoreResult<Vec<Entry>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(ENTRIES_BY_OWNER_TIME)?;
        let entries_table = read_txn.open_table(ENTRIES)?;

        let (start, end) = owner_range(owner);
        let mut entries = Vec::new();

        // Index keys ascend by timestamp; walk backwards for newest first.
        for item in idx_table.range(start.as_slice()..end.as_slice())?.rev() {
            let (_, pk) = item?;
            if let Some(doc) = entries_table.get(pk.value())? {
                entries.push(serde_json::from_slice(doc.value())?);
            }
        }

        Ok(entries)
    }

    fn upsert_blocking(&self, draft: EntryDraft) -> StoreResult<()> {
        let pk = primary_key(&draft.owner, &draft.client_id);
        let new_index_key = index_key(&draft.owner, draft.timestamp(), &draft.client_id);

        let write_txn = self.db.begin_write()?;
        {
            let mut entries_table = write_txn.open_table(ENTRIES)?;
            let mut idx_table = write_txn.open_table(ENTRIES_BY_OWNER_TIME)?;

            // Read existing value and deserialize before mutating
            let existing: Option<Entry> = {
                let guard = entries_table.get(pk.as_slice())?;
                match guard {
                    Some(doc) => Some(serde_json::from_slice(doc.value())?),
                    None => None,
                }
            };

            let storage_id = match &existing {
                Some(old) => {
                    let old_index_key = index_key(&old.owner, old.timestamp(), &old.client_id);
                    idx_table.remove(old_index_key.as_slice())?;
                    old.storage_id.clone()
                }
                None => new_storage_id(),
            };

            let entry = draft.into_entry(storage_id);
            let json = serde_json::to_vec(&entry)?;
            entries_table.insert(pk.as_slice(), json.as_slice())?;
            idx_table.insert(new_index_key.as_slice(), pk.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete_blocking(&self, owner: &str, client_id: &str) -> StoreResult<bool> {
        let pk = primary_key(owner, client_id);

        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut entries_table = write_txn.open_table(ENTRIES)?;
            let mut idx_table = write_txn.open_table(ENTRIES_BY_OWNER_TIME)?;

            let removed: Option<Entry> = {
                let guard = entries_table.remove(pk.as_slice())?;
                match guard {
                    Some(doc) => Some(serde_json::from_slice(doc.value())?),
                    None => None,
                }
            };

            if let Some(old) = &removed {
                let old_index_key = index_key(&old.owner, old.timestamp(), &old.client_id);
                idx_table.remove(old_index_key.as_slice())?;
            }
            removed.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}

#[async_trait]
impl EntryStore for RedbEntryStore {
    async fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<Entry>> {
        let store = self.clone();
        let owner = owner.to_string();
        tokio::task::spawn_blocking(move || store.list_blocking(&owner)).await?
    }

    async fn upsert(&self, draft: EntryDraft) -> StoreResult<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.upsert_blocking(draft)).await?
    }

    async fn delete(&self, owner: &str, client_id: &str) -> StoreResult<bool> {
        let store = self.clone();
        let owner = owner.to_string();
        let client_id = client_id.to_string();
        tokio::task::spawn_blocking(move || store.delete_blocking(&owner, &client_id)).await?
    }
}

// =============================================================================
// Tests
// =============================================================================

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Volatile entry store for local development and tests.
//!
//! Holds the same contract as the redb store: the write lock makes every
//! upsert and delete a single atomic step.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::keys::newest_first;
use super::{new_storage_id, EntryStore, StoreResult};
use crate::models::{Entry, EntryDraft};

/// `(owner, client_id)`
type EntryKey = (String, String);

#[derive(Default)]
pub struct InMemoryEntryStore {
    entries: RwLock<HashMap<EntryKey, Entry>>,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across all owners.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<Entry>> {
        let entries = self.entries.read().await;
        let mut owned: Vec<Entry> = entries
            .values()
            .filter(|entry| entry.owner == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            newest_first(a.timestamp(), b.timestamp()).then_with(|| b.client_id.cmp(&a.client_id))
        });
        Ok(owned)
    }

    async fn upsert(&self, draft: EntryDraft) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        let key = (draft.owner.clone(), draft.client_id.clone());
        let storage_id = entries
            .get(&key)
            .map(|existing| existing.storage_id.clone())
            .unwrap_or_else(new_storage_id);
        entries.insert(key, draft.into_entry(storage_id));
        Ok(())
    }

    async fn delete(&self, owner: &str, client_id: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(&(owner.to_string(), client_id.to_string()))
            .is_some())
    }
}

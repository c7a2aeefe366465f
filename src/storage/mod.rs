// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Entry Storage Module
//!
//! Persistence for entries behind the [`EntryStore`] trait. The HTTP layer
//! never sees a concrete store; it reaches one through a [`StoreGate`] that
//! only hands out the handle once the store is fully open.
//!
//! ## Backends
//!
//! | URI                         | Backend                |
//! |-----------------------------|------------------------|
//! | `redb:///var/lib/e.redb`    | [`RedbEntryStore`]     |
//! | `redb:data/e.redb`          | [`RedbEntryStore`]     |
//! | `memory:`                   | [`InMemoryEntryStore`] |
//!
//! ## Contract
//!
//! - `(owner, client_id)` identifies at most one entry.
//! - `upsert` is one atomic operation: concurrent first writes never produce
//!   two records, and a replace swaps the whole document.
//! - `list_by_owner` returns newest first (see [`keys::newest_first`]).
//! - `delete` is idempotent.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::models::{Entry, EntryDraft};

pub mod keys;
pub mod memory;
pub mod redb_store;

pub use memory::InMemoryEntryStore;
pub use redb_store::RedbEntryStore;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("entry store is not ready")]
    NotReady,

    #[error("entry store is already installed")]
    AlreadyInstalled,

    #[error("unsupported store URI: {0}")]
    UnsupportedUri(String),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Store Trait
// =============================================================================

/// Owner-scoped entry persistence.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// All entries of `owner`, newest first.
    async fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<Entry>>;

    /// Insert or wholly replace the entry keyed by the draft's owner and client id.
    async fn upsert(&self, draft: EntryDraft) -> StoreResult<()>;

    /// Remove the entry if present. Returns whether something was removed.
    async fn delete(&self, owner: &str, client_id: &str) -> StoreResult<bool>;
}

/// Fresh storage id for a newly inserted entry.
pub(crate) fn new_storage_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// =============================================================================
// Readiness Gate
// =============================================================================

/// Process-wide handle to the entry store, installed once at startup.
///
/// Cloning shares the same slot. Until [`StoreGate::install`] succeeds every
/// [`StoreGate::get`] fails with [`StoreError::NotReady`].
#[derive(Clone, Default)]
pub struct StoreGate {
    slot: Arc<OnceLock<Arc<dyn EntryStore>>>,
}

impl StoreGate {
    /// A gate with no store yet.
    pub fn pending() -> Self {
        Self::default()
    }

    /// A gate that is ready immediately.
    pub fn ready(store: Arc<dyn EntryStore>) -> Self {
        let gate = Self::pending();
        // A fresh slot is always empty.
        let _ = gate.slot.set(store);
        gate
    }

    /// Publish the store. Only the first call wins.
    pub fn install(&self, store: Arc<dyn EntryStore>) -> StoreResult<()> {
        self.slot.set(store).map_err(|_| StoreError::AlreadyInstalled)
    }

    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn get(&self) -> StoreResult<Arc<dyn EntryStore>> {
        self.slot.get().cloned().ok_or(StoreError::NotReady)
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Where a [`StoreGate`] should get its store from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Redb(PathBuf),
    Memory,
}

impl StoreLocation {
    /// Parse a `STORE_URI` value.
    pub fn parse(uri: &str) -> StoreResult<Self> {
        let url = Url::parse(uri).map_err(|e| StoreError::UnsupportedUri(format!("{uri}: {e}")))?;
        match url.scheme() {
            "memory" => Ok(Self::Memory),
            "redb" if !url.path().is_empty() => Ok(Self::Redb(PathBuf::from(url.path()))),
            "redb" => Err(StoreError::UnsupportedUri(format!("{uri}: missing path"))),
            other => Err(StoreError::UnsupportedUri(format!(
                "{uri}: unknown scheme '{other}'"
            ))),
        }
    }
}

/// Open the store (tables and index included) and return the shared handle.
pub async fn connect(location: &StoreLocation) -> StoreResult<Arc<dyn EntryStore>> {
    match location {
        StoreLocation::Memory => Ok(Arc::new(InMemoryEntryStore::new())),
        StoreLocation::Redb(path) => {
            let path = path.clone();
            let store = tokio::task::spawn_blocking(move || RedbEntryStore::open(&path)).await??;
            Ok(Arc::new(store))
        }
    }
}

// =============================================================================
// Background Open
// =============================================================================

/// Opens the store off the request path and installs it into a [`StoreGate`].
///
/// A failed open is recorded before `shutdown` is cancelled, so once the
/// server has drained [`StoreBootstrap::finish`] always sees the failure.
pub struct StoreBootstrap {
    task: JoinHandle<StoreResult<()>>,
    failed: CancellationToken,
}

impl StoreBootstrap {
    pub fn spawn(location: StoreLocation, gate: StoreGate, shutdown: CancellationToken) -> Self {
        let failed = CancellationToken::new();
        let task = tokio::spawn(open_into_gate(location, gate, shutdown, failed.clone()));
        Self { task, failed }
    }

    pub fn has_failed(&self) -> bool {
        self.failed.is_cancelled()
    }

    /// Outcome of the open once serving has stopped.
    ///
    /// Returns the open error if there was one. An open still in progress
    /// (shutdown by signal) is abandoned.
    pub async fn finish(self) -> StoreResult<()> {
        if self.failed.is_cancelled() {
            return self.task.await?;
        }
        self.task.abort();
        Ok(())
    }
}

async fn open_into_gate(
    location: StoreLocation,
    gate: StoreGate,
    shutdown: CancellationToken,
    failed: CancellationToken,
) -> StoreResult<()> {
    tracing::info!(location = ?location, "Opening entry store");

    let result = match connect(&location).await {
        Ok(store) => gate.install(store),
        Err(e) => Err(e),
    };

    match &result {
        Ok(()) => tracing::info!("Entry store ready"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to open entry store, shutting down");
            failed.cancel();
            shutdown.cancel();
        }
    }
    result
}

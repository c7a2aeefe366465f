// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entry store service.
//!
//! Every operation is scoped to the [`AuthenticatedUser`] handed over by the
//! authentication gate; no operation accepts an owner from request content.
//! Validation happens before the store is reached, and store failures are
//! returned as-is (no retries).

use serde_json::Value;

use crate::auth::AuthenticatedUser;
use crate::models::{Entry, EntryDraft, EntryValidationError};
use crate::storage::{StoreError, StoreGate};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] EntryValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct EntryService {
    store: StoreGate,
}

impl EntryService {
    pub fn new(store: StoreGate) -> Self {
        Self { store }
    }

    /// The readiness gate behind this service.
    pub fn store(&self) -> &StoreGate {
        &self.store
    }

    /// All of the caller's entries, newest first.
    pub async fn list(&self, user: &AuthenticatedUser) -> Result<Vec<Entry>, ServiceError> {
        let store = self.store.get()?;
        Ok(store.list_by_owner(&user.user_id).await?)
    }

    /// Insert or replace the caller's entry named by `payload.id`.
    pub async fn upsert(&self, user: &AuthenticatedUser, payload: Value) -> Result<(), ServiceError> {
        let draft = EntryDraft::from_payload(&user.user_id, payload)?;
        let store = self.store.get()?;

        tracing::debug!(owner = %draft.owner, client_id = %draft.client_id, "Upserting entry");
        store.upsert(draft).await?;
        Ok(())
    }

    /// Remove the caller's entry if it exists.
    pub async fn delete(&self, user: &AuthenticatedUser, client_id: &str) -> Result<(), ServiceError> {
        let store = self.store.get()?;
        let removed = store.delete(&user.user_id, client_id).await?;

        tracing::debug!(owner = %user.user_id, client_id, removed, "Deleted entry");
        Ok(())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::service::EntryService;
use crate::storage::StoreGate;

#[derive(Clone)]
pub struct AppState {
    pub entries: EntryService,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(store: StoreGate, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            entries: EntryService::new(store),
            verifier,
        }
    }
}

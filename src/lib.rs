// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entry Sync Server - per-user entry synchronization backend
//!
//! Clients keep entries locally and push them here keyed by their own ids.
//! Each entry belongs to the Firebase user that wrote it; no user can read,
//! overwrite or delete another user's entries.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Firebase ID token verification and the `Auth` extractor
//! - `service` - Owner-scoped entry operations
//! - `storage` - Entry stores (redb, in-memory) and the readiness gate

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod state;
pub mod storage;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the entry API.
//!
//! ## Auth Flow
//!
//! 1. The client signs in with Firebase Authentication
//! 2. The client sends `Authorization: Bearer <Firebase ID token>`
//! 3. The server:
//!    - rejects a missing or malformed header without calling the verifier
//!    - verifies the token through an [`IdentityVerifier`]
//!    - hands the resulting [`AuthenticatedUser`] to the handler
//!
//! ## Security
//!
//! - Every `/entries` route requires authentication; probes and docs do not
//! - Rejections never reveal why a token failed
//! - Tokens are never cached, logged, or persisted
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod firebase;
pub mod jwks;
pub mod verifier;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::Auth;
#[cfg(any(test, feature = "dev"))]
pub use firebase::EmulatorVerifier;
pub use firebase::FirebaseVerifier;
pub use jwks::SigningKeys;
pub use verifier::{IdentityVerifier, VerifyError};

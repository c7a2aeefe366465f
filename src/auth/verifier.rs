// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity verifier abstraction.
//!
//! The authentication gate only needs one capability from the identity
//! provider: turn a bearer token into a stable user id, or fail.

use async_trait::async_trait;

use super::AuthenticatedUser;

/// Why a token was rejected.
///
/// Never returned to HTTP callers; the gate collapses every variant into
/// a generic "Invalid token" response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("token is malformed")]
    MalformedToken,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    TokenExpired,

    #[error("token is not yet valid")]
    TokenNotYetValid,

    #[error("token issuer is invalid")]
    InvalidIssuer,

    #[error("token audience is invalid")]
    InvalidAudience,

    #[error("token subject is invalid")]
    InvalidSubject,

    #[error("no matching key in JWKS")]
    NoMatchingKey,

    #[error("failed to fetch JWKS: {0}")]
    JwksFetch(String),
}

/// Resolves bearer tokens to users.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, VerifyError>;
}

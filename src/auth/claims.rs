// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Firebase ID token claims and the authenticated user representation.

use serde::{Deserialize, Serialize};

use super::VerifyError;

/// Clock skew tolerance (60 seconds).
pub const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Maximum length of a Firebase uid.
const MAX_SUBJECT_LEN: usize = 128;

/// Issuer prefix for Firebase ID tokens; the project id follows.
pub const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Claims carried by a Firebase ID token.
///
/// See: https://firebase.google.com/docs/auth/admin/verify-id-tokens
#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseClaims {
    /// Subject: the Firebase uid
    pub sub: String,

    /// Issuer (`https://securetoken.google.com/<project>`)
    pub iss: String,

    /// Audience (the project id)
    pub aud: String,

    /// Issued at timestamp
    pub iat: u64,

    /// Expiration timestamp
    pub exp: u64,

    /// When the user authenticated
    #[serde(default)]
    pub auth_time: Option<u64>,
}

impl FirebaseClaims {
    /// Check the claims that signature validation does not cover and build the user.
    ///
    /// `now` is seconds since the Unix epoch.
    pub fn into_user(self, project_id: &str, now: u64) -> Result<AuthenticatedUser, VerifyError> {
        if self.aud != project_id {
            return Err(VerifyError::InvalidAudience);
        }
        if self.iss.strip_prefix(FIREBASE_ISSUER_PREFIX) != Some(project_id) {
            return Err(VerifyError::InvalidIssuer);
        }
        if self.exp.saturating_add(CLOCK_SKEW_LEEWAY) < now {
            return Err(VerifyError::TokenExpired);
        }
        let latest_allowed = now.saturating_add(CLOCK_SKEW_LEEWAY);
        if self.iat > latest_allowed || self.auth_time.is_some_and(|t| t > latest_allowed) {
            return Err(VerifyError::TokenNotYetValid);
        }
        if self.sub.is_empty() || self.sub.len() > MAX_SUBJECT_LEN {
            return Err(VerifyError::InvalidSubject);
        }

        Ok(AuthenticatedUser::new(self.sub))
    }
}

/// The caller of a request, as resolved by the identity verifier.
///
/// Passed by value from the `Auth` extractor into every entry operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Canonical user ID (Firebase `sub` claim)
    pub user_id: String,
}

impl AuthenticatedUser {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

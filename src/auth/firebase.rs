// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Firebase ID token verification.
//!
//! ## Production
//!
//! [`FirebaseVerifier`] checks the RS256 signature against Google's JWKS,
//! then issuer, audience, expiry and subject.
//!
//! ## Development
//!
//! [`EmulatorVerifier`] (only with the `dev` feature) accepts the unsigned
//! tokens minted by the Firebase Auth emulator. It still checks every claim.

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, get_current_timestamp, Algorithm, Validation};

use super::claims::{FirebaseClaims, CLOCK_SKEW_LEEWAY, FIREBASE_ISSUER_PREFIX};
use super::{AuthenticatedUser, IdentityVerifier, SigningKeys, VerifyError};

/// Verifies Firebase ID tokens for one project.
pub struct FirebaseVerifier {
    project_id: String,
    keys: SigningKeys,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>, keys: SigningKeys) -> Self {
        Self {
            project_id: project_id.into(),
            keys,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn signing_keys(&self) -> &SigningKeys {
        &self.keys
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_issuer(&[format!("{FIREBASE_ISSUER_PREFIX}{}", self.project_id)]);
        validation.set_audience(&[&self.project_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, VerifyError> {
        let header = decode_header(token).map_err(|_| VerifyError::MalformedToken)?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::MalformedToken);
        }
        let kid = header.kid.ok_or(VerifyError::MalformedToken)?;

        let decoding_key = self.keys.key(&kid).await?;

        let token_data = decode::<FirebaseClaims>(token, &decoding_key, &self.validation())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerifyError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => VerifyError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => VerifyError::InvalidAudience,
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => VerifyError::TokenNotYetValid,
                _ => VerifyError::MalformedToken,
            })?;

        token_data
            .claims
            .into_user(&self.project_id, get_current_timestamp())
    }
}

/// Verifies unsigned tokens from the Firebase Auth emulator.
///
/// WARNING: performs no signature check. Development builds only.
#[cfg(any(test, feature = "dev"))]
pub struct EmulatorVerifier {
    project_id: String,
}

#[cfg(any(test, feature = "dev"))]
impl EmulatorVerifier {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

#[cfg(any(test, feature = "dev"))]
#[async_trait]
impl IdentityVerifier for EmulatorVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, VerifyError> {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        // Emulator tokens carry `alg: none`, which jsonwebtoken refuses to parse.
        let payload = token
            .split('.')
            .nth(1)
            .ok_or(VerifyError::MalformedToken)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| VerifyError::MalformedToken)?;
        let claims: FirebaseClaims =
            serde_json::from_slice(&bytes).map_err(|_| VerifyError::MalformedToken)?;

        claims.into_user(&self.project_id, get_current_timestamp())
    }
}

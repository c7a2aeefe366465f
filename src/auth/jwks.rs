// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Google signing keys for Firebase ID tokens.
//!
//! Keys are fetched from a JWKS endpoint over HTTPS and held, already
//! converted to [`DecodingKey`]s, until the endpoint's `Cache-Control:
//! max-age` runs out. An unknown `kid` forces an early refetch (Google
//! rotates keys), rate-limited so forged key ids cannot hammer the endpoint.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::DecodingKey;
use reqwest::header::CACHE_CONTROL;
use tokio::sync::RwLock;

use super::VerifyError;

/// Google's JWKS endpoint for Firebase ID token signing keys.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Lifetime used when the endpoint sends no `max-age`.
const FALLBACK_TTL: Duration = Duration::from_secs(300);

/// Minimum spacing between refetches triggered by an unknown `kid`.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

struct KeySnapshot {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
    expires_at: Instant,
}

impl KeySnapshot {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

pub struct SigningKeys {
    url: String,
    fallback_ttl: Duration,
    http: reqwest::Client,
    snapshot: RwLock<Option<KeySnapshot>>,
}

impl SigningKeys {
    pub fn new(url: impl Into<String>) -> Result<Self, VerifyError> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| VerifyError::JwksFetch(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            fallback_ttl: FALLBACK_TTL,
            http,
            snapshot: RwLock::new(None),
        })
    }

    pub fn with_fallback_ttl(mut self, ttl: Duration) -> Self {
        self.fallback_ttl = ttl;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether a fresh key set is held.
    pub async fn has_fresh_keys(&self) -> bool {
        self.snapshot
            .read()
            .await
            .as_ref()
            .is_some_and(KeySnapshot::is_fresh)
    }

    /// The RSA verification key published under `kid`.
    pub async fn key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        {
            let snapshot = self.snapshot.read().await;
            if let Some(snapshot) = snapshot.as_ref().filter(|s| s.is_fresh()) {
                if let Some(key) = snapshot.keys.get(kid) {
                    return Ok(key.clone());
                }
                if snapshot.fetched_at.elapsed() < MIN_REFETCH_INTERVAL {
                    return Err(VerifyError::NoMatchingKey);
                }
            }
        }

        let mut snapshot = self.snapshot.write().await;
        // Another request may have refreshed while we waited for the lock.
        let stale = snapshot
            .as_ref()
            .is_none_or(|s| !s.is_fresh() || !s.keys.contains_key(kid));
        if stale {
            *snapshot = Some(self.fetch().await?);
        }

        snapshot
            .as_ref()
            .and_then(|s| s.keys.get(kid))
            .cloned()
            .ok_or(VerifyError::NoMatchingKey)
    }

    async fn fetch(&self) -> Result<KeySnapshot, VerifyError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| VerifyError::JwksFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VerifyError::JwksFetch(format!("endpoint returned {status}")));
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(self.fallback_ttl);

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| VerifyError::JwksFetch(e.to_string()))?;

        let keys = rsa_keys(&set);
        tracing::debug!(keys = keys.len(), ttl_secs = ttl.as_secs(), "Fetched Firebase signing keys");

        let now = Instant::now();
        Ok(KeySnapshot {
            keys,
            fetched_at: now,
            expires_at: now + ttl,
        })
    }
}

/// `max-age` seconds from a `Cache-Control` value.
fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// RSA keys of `set` by key id. Keys without an id, or of another type, are skipped.
fn rsa_keys(set: &JwkSet) -> HashMap<String, DecodingKey> {
    set.keys
        .iter()
        .filter_map(|jwk| {
            let kid = jwk.common.key_id.clone()?;
            let AlgorithmParameters::RSA(rsa) = &jwk.algorithm else {
                return None;
            };
            match DecodingKey::from_rsa_components(&rsa.n, &rsa.e) {
                Ok(key) => Some((kid, key)),
                Err(e) => {
                    tracing::warn!(kid = %kid, error = %e, "Skipping malformed RSA signing key");
                    None
                }
            }
        })
        .collect()
}

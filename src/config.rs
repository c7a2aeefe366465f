// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `STORE_URI` | Entry store URI (`redb:<path>` or `memory:`) | Required |
//! | `FIREBASE_PROJECT_ID` | Firebase project that issues ID tokens | Required |
//! | `FIREBASE_JWKS_URL` | Override for Google's signing key endpoint | Google endpoint |
//! | `FIREBASE_AUTH_EMULATOR_HOST` | Accept Auth emulator tokens (`dev` builds only) | Unset |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `4000` |
//! | `TLS_CERT_PATH` | PEM certificate chain; enables HTTPS with `TLS_KEY_PATH` | Unset |
//! | `TLS_KEY_PATH` | PEM private key | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::auth::jwks::FIREBASE_JWKS_URL;
use crate::storage::{StoreError, StoreLocation};

pub const STORE_URI_ENV: &str = "STORE_URI";
pub const FIREBASE_PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";
pub const FIREBASE_JWKS_URL_ENV: &str = "FIREBASE_JWKS_URL";
pub const FIREBASE_AUTH_EMULATOR_HOST_ENV: &str = "FIREBASE_AUTH_EMULATOR_HOST";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} config missing. Provide it via the {0} environment variable")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Result<Self, ConfigError> {
        match value.map(str::trim) {
            None | Some("") | Some("pretty") => Ok(Self::Pretty),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                reason: format!("expected 'json' or 'pretty', got '{other}'"),
            }),
        }
    }
}

/// How bearer tokens are verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Signature-checked Firebase ID tokens.
    Firebase { project_id: String, jwks_url: String },
    /// Unsigned tokens from the Auth emulator at `host`.
    Emulator { project_id: String, host: String },
}

/// PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreLocation,
    pub auth: AuthMode,
    pub tls: Option<TlsPaths>,
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let store_uri = get(STORE_URI_ENV).ok_or(ConfigError::Missing(STORE_URI_ENV))?;
        let store = StoreLocation::parse(&store_uri)?;

        let project_id =
            get(FIREBASE_PROJECT_ID_ENV).ok_or(ConfigError::Missing(FIREBASE_PROJECT_ID_ENV))?;
        let auth = match get(FIREBASE_AUTH_EMULATOR_HOST_ENV) {
            Some(host) if cfg!(feature = "dev") => AuthMode::Emulator { project_id, host },
            Some(_) => {
                return Err(ConfigError::Invalid {
                    name: FIREBASE_AUTH_EMULATOR_HOST_ENV,
                    reason: "emulator tokens require a build with the `dev` feature".to_string(),
                })
            }
            None => AuthMode::Firebase {
                project_id,
                jwks_url: get(FIREBASE_JWKS_URL_ENV)
                    .unwrap_or_else(|| FIREBASE_JWKS_URL.to_string()),
            },
        };

        let host: IpAddr = get(HOST_ENV)
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: HOST_ENV,
                reason: format!("{e}"),
            })?;
        let port: u16 = match get(PORT_ENV) {
            Some(port) => port.parse().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: format!("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together"),
                })
            }
        };

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            store,
            auth,
            tls,
        })
    }
}

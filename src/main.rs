// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{process::ExitCode, sync::Arc, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use entry_sync_server::{
    api::router,
    auth::{FirebaseVerifier, IdentityVerifier, SigningKeys, VerifyError},
    config::{AuthMode, ConfigError, LogFormat, ServerConfig, TlsPaths, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::{StoreBootstrap, StoreError, StoreGate},
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("identity verifier: {0}")]
    Verifier(#[from] VerifyError),

    #[error("entry store: {0}")]
    Store(#[from] StoreError),

    #[error("tls: {0}")]
    Tls(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let log_format = LogFormat::from_env();
    init_tracing(log_format.as_ref().copied().unwrap_or(LogFormat::Pretty));

    let result = match log_format {
        Ok(_) => run().await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Entry sync server failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;

    // Install the ring crypto provider for rustls (before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| StartupError::Tls("failed to install rustls crypto provider".to_string()))?;

    let verifier = build_verifier(&config.auth)?;
    let gate = StoreGate::pending();
    let app = router(AppState::new(gate.clone(), verifier));

    let shutdown = CancellationToken::new();
    let bootstrap = StoreBootstrap::spawn(config.store.clone(), gate, shutdown.clone());
    tokio::spawn(watch_signals(shutdown.clone()));

    match &config.tls {
        Some(tls) => {
            tracing::info!(addr = %config.bind_addr, "Entry sync server listening on https (docs at /docs)");
            serve_tls(config.bind_addr, tls, app, shutdown.clone()).await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
            tracing::info!(addr = %config.bind_addr, "Entry sync server listening on http (docs at /docs)");
            let token = shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await?;
        }
    }

    bootstrap.finish().await?;

    tracing::info!("Entry sync server stopped");
    Ok(())
}

fn build_verifier(mode: &AuthMode) -> Result<Arc<dyn IdentityVerifier>, StartupError> {
    match mode {
        AuthMode::Firebase {
            project_id,
            jwks_url,
        } => {
            tracing::info!(project_id = %project_id, "Verifying Firebase ID tokens");
            let keys = SigningKeys::new(jwks_url.clone())?;
            Ok(Arc::new(FirebaseVerifier::new(project_id.clone(), keys)))
        }
        AuthMode::Emulator { project_id, host } => emulator_verifier(project_id, host),
    }
}

#[cfg(feature = "dev")]
fn emulator_verifier(
    project_id: &str,
    host: &str,
) -> Result<Arc<dyn IdentityVerifier>, StartupError> {
    tracing::warn!(
        project_id = %project_id,
        emulator = %host,
        "Accepting unsigned Auth emulator tokens; never run this build in production"
    );
    Ok(Arc::new(entry_sync_server::auth::EmulatorVerifier::new(
        project_id,
    )))
}

#[cfg(not(feature = "dev"))]
fn emulator_verifier(
    _project_id: &str,
    _host: &str,
) -> Result<Arc<dyn IdentityVerifier>, StartupError> {
    Err(ConfigError::Invalid {
        name: entry_sync_server::config::FIREBASE_AUTH_EMULATOR_HOST_ENV,
        reason: "emulator tokens require a build with the `dev` feature".to_string(),
    }
    .into())
}

async fn serve_tls(
    addr: std::net::SocketAddr,
    tls: &TlsPaths,
    app: axum::Router,
    shutdown: CancellationToken,
) -> Result<(), StartupError> {
    let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
        .await
        .map_err(|e| StartupError::Tls(format!("failed to load certificate: {e}")))?;

    let handle = axum_server::Handle::new();
    let trigger = handle.clone();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        trigger.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => return,
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}

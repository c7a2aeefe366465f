// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Ok,
    Starting,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: ProbeStatus,
}

/// Overall status plus one entry per dependency.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    pub status: ProbeStatus,
    pub checks: ReadyChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyChecks {
    /// `starting` until the entry store is open.
    pub store: ProbeStatus,
}

/// Liveness probe. Touches neither the store nor the identity provider.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Process is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: ProbeStatus::Ok,
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Entry store is open", body = ReadyResponse),
        (status = 503, description = "Entry store is still opening", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let (code, store) = if state.entries.store().is_ready() {
        (StatusCode::OK, ProbeStatus::Ok)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, ProbeStatus::Starting)
    };

    (
        code,
        Json(ReadyResponse {
            status: store,
            checks: ReadyChecks { store },
        }),
    )
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entry sync endpoints.
//!
//! All operations require authentication and act only on the caller's own
//! entries.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{Map, Value};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{Entry, SuccessResponse},
    state::AppState,
};

/// List the caller's entries, newest first.
#[utoipa::path(
    get,
    path = "/entries",
    tag = "Entries",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Entries owned by the caller", body = [Entry]),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Entry store is not ready"),
        (status = 500, description = "Entry store failure")
    )
)]
pub async fn list_entries(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    let entries = state.entries.list(&user).await?;
    Ok(Json(entries))
}

/// Insert or replace the entry identified by `id`.
///
/// The stored document is exactly the submitted payload (minus `_id`) with
/// `uid` set to the caller.
#[utoipa::path(
    post,
    path = "/entries",
    tag = "Entries",
    security(("bearer_auth" = [])),
    request_body(content = Object, description = "Entry payload; must contain a string `id`"),
    responses(
        (status = 200, description = "Entry stored", body = SuccessResponse),
        (status = 400, description = "Missing or invalid `id`, or a body that is not valid JSON"),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Entry store is not ready"),
        (status = 500, description = "Entry store failure")
    )
)]
pub async fn upsert_entry(
    Auth(user): Auth,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let payload = entry_payload(body)?;
    state.entries.upsert(&user, payload).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Delete the caller's entry with the given client id.
///
/// Succeeds whether or not the entry existed.
#[utoipa::path(
    delete,
    path = "/entries/{id}",
    tag = "Entries",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Client id of the entry to delete")
    ),
    responses(
        (status = 200, description = "Entry deleted (or already absent)", body = SuccessResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Entry store is not ready"),
        (status = 500, description = "Entry store failure")
    )
)]
pub async fn delete_entry(
    Auth(user): Auth,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.entries.delete(&user, &client_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Unwrap the JSON body, mapping rejections onto `{"error": ...}` responses.
///
/// A body not sent as `application/json` is read as an empty payload, so it
/// fails validation with "Entry id required".
fn entry_payload(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    match body {
        Ok(Json(payload)) => Ok(payload),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(Value::Object(Map::new())),
        Err(JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_)) => {
            Err(ApiError::bad_request(INVALID_JSON_BODY))
        }
        Err(other) => Err(ApiError::new(other.status(), other.body_text())),
    }
}

const INVALID_JSON_BODY: &str = "Request body must be valid JSON";

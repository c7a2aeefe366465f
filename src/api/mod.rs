// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{Entry, SuccessResponse},
    state::AppState,
};

pub mod entries;
pub mod health;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route(
            "/entries",
            get(entries::list_entries).post(entries::upsert_entry),
        )
        .route("/entries/{id}", delete(entries::delete_entry))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::readiness,
        entries::list_entries,
        entries::upsert_entry,
        entries::delete_entry
    ),
    components(
        schemas(
            Entry,
            SuccessResponse,
            health::HealthResponse,
            health::ReadyResponse,
            health::ReadyChecks,
            health::ProbeStatus
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Entries", description = "Per-user entry sync")
    )
)]
struct ApiDoc;

/// Registers the `bearer_auth` security scheme referenced by entry paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verifier::testing::StaticVerifier;
    use crate::models::EntryDraft;
    use crate::storage::{EntryStore, InMemoryEntryStore, StoreGate, StoreResult};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tower::ServiceExt;

    /// In-memory store that counts every call it receives.
    #[derive(Default)]
    struct RecordingStore {
        inner: InMemoryEntryStore,
        calls: AtomicUsize,
    }

    impl RecordingStore {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntryStore for RecordingStore {
        async fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<Entry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_by_owner(owner).await
        }

        async fn upsert(&self, draft: EntryDraft) -> StoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.upsert(draft).await
        }

        async fn delete(&self, owner: &str, client_id: &str) -> StoreResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(owner, client_id).await
        }
    }

    fn verifier() -> Arc<StaticVerifier> {
        Arc::new(
            StaticVerifier::new()
                .with_user("token-a", "A")
                .with_user("token-b", "B"),
        )
    }

    fn test_app() -> (Router, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::default());
        let state = AppState::new(StoreGate::ready(store.clone()), verifier());
        (router(state), store)
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (app, _) = test_app();
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn health_needs_no_credentials_or_store() {
        let state = AppState::new(StoreGate::pending(), Arc::new(StaticVerifier::new()));
        let app = router(state);

        let resp = app
            .oneshot(request(Method::GET, "/health", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(body_json(resp).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn readiness_tracks_store_gate() {
        let gate = StoreGate::pending();
        let app = router(AppState::new(gate.clone(), verifier()));

        let resp = app
            .clone()
            .oneshot(request(Method::GET, "/health/ready", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        gate.install(Arc::new(InMemoryEntryStore::new())).unwrap();
        let resp = app
            .oneshot(request(Method::GET, "/health/ready", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            json!({"status": "ok", "checks": {"store": "ok"}})
        );
    }

    #[tokio::test]
    async fn unauthenticated_list_never_reaches_store() {
        let (app, store) = test_app();

        let resp = app
            .clone()
            .oneshot(request(Method::GET, "/entries", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await, json!({"error": "Missing token"}));

        let resp = app
            .oneshot(request(Method::GET, "/entries", Some("forged"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await, json!({"error": "Invalid token"}));

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn post_without_id_is_rejected() {
        let (app, store) = test_app();

        let resp = app
            .oneshot(request(
                Method::POST,
                "/entries",
                Some("token-a"),
                Some(json!({"text": "hello"})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({"error": "Entry id required"}));
        assert_eq!(store.calls(), 0);
    }

    fn raw_post(content_type: Option<&str>, body: &'static str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/entries")
            .header("Authorization", "Bearer token-a");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn post_without_json_content_type_reads_as_empty_payload() {
        let (app, store) = test_app();

        for request in [raw_post(None, ""), raw_post(Some("text/plain"), r#"{"id":"e1"}"#)] {
            let resp = app.clone().oneshot(request).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(resp).await, json!({"error": "Entry id required"}));
        }
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn post_with_malformed_json_returns_json_error() {
        let (app, store) = test_app();

        for body in ["{oops", ""] {
            let resp = app
                .clone()
                .oneshot(raw_post(Some("application/json"), body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                body_json(resp).await,
                json!({"error": "Request body must be valid JSON"})
            );
        }
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn post_with_non_object_json_is_rejected() {
        let (app, _) = test_app();

        let resp = app
            .oneshot(raw_post(Some("application/json"), r#"["e1"]"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await,
            json!({"error": "Entry payload must be a JSON object"})
        );
    }

    #[tokio::test]
    async fn unauthenticated_malformed_post_is_401_first() {
        let (app, _) = test_app();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/entries")
            .header("content-type", "application/json")
            .body(Body::from("{oops"))
            .unwrap();
        let resp = app.oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await, json!({"error": "Missing token"}));
    }

    #[tokio::test]
    async fn unknown_path_is_404_not_401() {
        let (app, store) = test_app();

        let resp = app
            .oneshot(request(Method::GET, "/entries/e1/history", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn entries_before_store_ready_return_503() {
        let app = router(AppState::new(StoreGate::pending(), verifier()));

        let resp = app
            .oneshot(request(Method::GET, "/entries", Some("token-a"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(resp).await,
            json!({"error": "Entry store is not ready"})
        );
    }

    #[tokio::test]
    async fn end_to_end_sync_scenario() {
        let (app, _) = test_app();

        let resp = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/entries",
                Some("token-a"),
                Some(json!({"id": "e1", "text": "hello"})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({"success": true}));

        let resp = app
            .clone()
            .oneshot(request(Method::GET, "/entries", Some("token-a"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let listed = body_json(resp).await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], "e1");
        assert_eq!(listed[0]["text"], "hello");
        assert_eq!(listed[0]["uid"], "A");
        assert!(listed[0]["_id"].is_string());

        let resp = app
            .clone()
            .oneshot(request(Method::GET, "/entries", Some("token-b"), None))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await, json!([]));

        let resp = app
            .clone()
            .oneshot(request(Method::DELETE, "/entries/e1", Some("token-a"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({"success": true}));

        let resp = app
            .clone()
            .oneshot(request(Method::GET, "/entries", Some("token-a"), None))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await, json!([]));

        // Deleting again is still a success.
        let resp = app
            .oneshot(request(Method::DELETE, "/entries/e1", Some("token-a"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_document_lists_entry_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/entries"));
        assert!(doc.paths.paths.contains_key("/entries/{id}"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}

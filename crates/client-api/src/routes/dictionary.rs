//! `POST /dictionary/*`: the Store's subscribe and messages operations.

use super::{core_error_response, reject_empty_client_id};
use crate::AppState;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use http::StatusCode;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SubscribeParams {
    client_id: String,
    domain: String,
}

/// `POST /dictionary/subscribe?client_id=...&domain=...` — enqueues a
/// subscribe meta-message; the domain's worker emits the replay
/// asynchronously over the Push channel.
async fn subscribe(State(state): State<AppState>, Query(params): Query<SubscribeParams>) -> axum::response::Response {
    if let Err(resp) = reject_empty_client_id(&params.client_id) {
        return resp;
    }
    match state.store.subscribe(params.client_id, &params.domain) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => core_error_response(err).into_response(),
    }
}

#[derive(Deserialize)]
pub struct MessagesParams {
    client_id: String,
    messages: String,
}

/// `POST /dictionary/messages?client_id=...&messages=...` — `messages` is a
/// JSON-array-of-Message string, matching the wire schema in §6. Only a
/// request-level parse failure (not valid JSON, or not an array) fails the
/// request; malformed individual elements are reported via `on_error` and
/// dropped without failing the call (§4.4).
async fn messages(State(state): State<AppState>, Query(params): Query<MessagesParams>) -> axum::response::Response {
    if let Err(resp) = reject_empty_client_id(&params.client_id) {
        return resp;
    }
    match state.store.messages(params.client_id, &params.messages) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => core_error_response(err).into_response(),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/messages", post(messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use realtime_core::{Config, PushCore, StoreCore};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use urlencoding::encode;

    fn app() -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path())
            .with_client_timeout(Duration::from_secs(60))
            .with_receive_timeout(Duration::from_millis(200));
        let push = Arc::new(PushCore::new(config.client_timeout, config.receive_timeout, config.hooks.clone()));
        let store = StoreCore::new(push.clone(), &config);
        let state = AppState { push, store };
        (crate::router(&config, state), dir)
    }

    #[tokio::test]
    async fn subscribe_to_an_invalid_domain_is_400() {
        let (app, _dir) = app();
        let resp = app
            .oneshot(
                Request::post("/dictionary/subscribe?client_id=a&domain=_")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn subscribe_with_an_empty_client_id_is_400() {
        let (app, _dir) = app();
        let resp = app
            .oneshot(
                Request::post("/dictionary/subscribe?client_id=&domain=d1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn subscribe_then_receive_carries_the_replay() {
        let (app, _dir) = app();
        app.clone()
            .oneshot(Request::get("/comet/connect?client_id=a").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let resp = app
            .clone()
            .oneshot(
                Request::post("/dictionary/subscribe?client_id=a&domain=d1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::get("/comet/receive?client_id=a").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("_synced"));
    }

    #[tokio::test]
    async fn messages_with_a_malformed_batch_is_rejected_at_the_request_level() {
        let (app, _dir) = app();
        let bad = encode("not json");
        let uri = format!("/dictionary/messages?client_id=a&messages={bad}");
        let resp = app.oneshot(Request::post(uri).body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

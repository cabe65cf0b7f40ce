//! `GET /comet/*`: the Push channel's four operations.

use super::{core_error_response, reject_empty_client_id};
use crate::AppState;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use http::StatusCode;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct ClientIdParams {
    client_id: String,
}

/// `GET /comet/connect?client_id=...` — creates the client's record (or, if
/// already connected, just refreshes its heartbeat). Never fails.
async fn connect(State(state): State<AppState>, Query(params): Query<ClientIdParams>) -> axum::response::Response {
    if let Err(resp) = reject_empty_client_id(&params.client_id) {
        return resp;
    }
    state.push.connect(params.client_id);
    StatusCode::OK.into_response()
}

/// `GET /comet/disconnect?client_id=...` — idempotent; unknown ids succeed
/// silently.
async fn disconnect(State(state): State<AppState>, Query(params): Query<ClientIdParams>) -> axum::response::Response {
    if let Err(resp) = reject_empty_client_id(&params.client_id) {
        return resp;
    }
    state.push.disconnect(&params.client_id);
    state.store.disconnected(&params.client_id);
    StatusCode::OK.into_response()
}

/// `GET /comet/receive?client_id=...` — blocks up to `receive_timeout`. The
/// response body is the raw JSON payload that was queued, or empty on
/// timeout/wake; a non-registered client is a 501.
async fn receive(State(state): State<AppState>, Query(params): Query<ClientIdParams>) -> axum::response::Response {
    if let Err(resp) = reject_empty_client_id(&params.client_id) {
        return resp;
    }
    match state.push.receive(&params.client_id).await {
        Ok(Some(payload)) => payload.into_response(),
        Ok(None) => StatusCode::OK.into_response(),
        Err(err) => core_error_response(err).into_response(),
    }
}

/// `GET /comet/flush?client_id=...` — wakes any in-flight receive for this
/// client immediately.
async fn flush(State(state): State<AppState>, Query(params): Query<ClientIdParams>) -> axum::response::Response {
    if let Err(resp) = reject_empty_client_id(&params.client_id) {
        return resp;
    }
    match state.push.flush(&params.client_id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => core_error_response(err).into_response(),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connect", get(connect))
        .route("/disconnect", get(disconnect))
        .route("/receive", get(receive))
        .route("/flush", get(flush))
}

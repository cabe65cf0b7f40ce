pub mod comet;
pub mod dictionary;

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use realtime_core::CoreError;

/// Maps the engine's error taxonomy onto the three outcomes the protocol
/// recognizes at the HTTP boundary (§7): an unknown Push client is a 501,
/// anything else well-formed-but-rejected is a 400 with a reason string.
pub(crate) fn core_error_response(err: CoreError) -> (StatusCode, String) {
    match err {
        CoreError::UnknownClient(_) => (StatusCode::NOT_IMPLEMENTED, err.to_string()),
        CoreError::BadDomain(_) | CoreError::MalformedMessage(_) => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}

/// The spec singles out the empty string as the one `client_id` shape the
/// adapter itself rejects (§9): an empty id would make "unknown client" and
/// "no client_id supplied" indistinguishable in logs and hooks.
pub(crate) fn reject_empty_client_id(client_id: &str) -> Result<(), Response> {
    if client_id.is_empty() {
        Err((StatusCode::BAD_REQUEST, "client_id must not be empty".to_string()).into_response())
    } else {
        Ok(())
    }
}

//! HTTP Adapter (component E): a thin translation from HTTP requests and
//! query parameters to [`realtime_core::PushCore`] and
//! [`realtime_core::StoreCore`] operations.
//!
//! The URL surface is fixed by the protocol (§4.5 of the design); only the
//! two path prefixes are configurable, via [`realtime_core::Config`].

pub mod routes;

use axum::Router;
use realtime_core::{Config, PushCore, StoreCore};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub push: Arc<PushCore>,
    pub store: Arc<StoreCore>,
}

/// Builds the full router: the Push endpoints nested under
/// `config.comet_prefix`, the Store endpoints nested under
/// `config.store_prefix`.
pub fn router(config: &Config, state: AppState) -> Router {
    Router::new()
        .nest(&config.comet_prefix, routes::comet::router())
        .nest(&config.store_prefix, routes::dictionary::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

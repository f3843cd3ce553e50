//! `driftline-server`: the HTTP/WebSocket/SSE surface over the matchmaking
//! core (SPEC_FULL.md). `main.rs` wires this crate's pieces into a running
//! binary; everything reusable by tests lives here.

pub mod auth;
pub mod config;
pub mod db;
pub mod fanout;
pub mod http;
pub mod notifications;
pub mod repo;
pub mod schedulers;
pub mod state;
pub mod ws;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full router: search/heartbeat/health/SSE over HTTP, the two
/// socket namespaces, all sharing one `AppState` (spec.md §6).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/search/:pool/start-search/:user_id", post(http::search::start_search))
        .route("/api/v1/search/:pool/stop-search/:user_id", post(http::search::stop_search))
        .route("/api/v1/search/:pool/:user_id", get(http::search::poll_match))
        .route("/api/v1/heartbeat", post(http::heartbeat::heartbeat))
        .route("/sse/events", get(http::sse::notifications_sse))
        .route("/health", get(http::health::health))
        .route("/ws/chat", get(ws::chat::chat_ws_handler))
        .route("/ws/call", get(ws::call::call_ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

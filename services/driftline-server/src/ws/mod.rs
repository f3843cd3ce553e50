//! `/ws/chat` and `/ws/call` socket hub (spec.md §4.F). Each namespace runs
//! its own connection state machine over the same `AppState`, the same
//! Redis pub/sub adapter, and the same per-socket rate limiter.

pub mod call;
pub mod chat;

use axum::http::HeaderMap;
use driftline_protocol::SessionClaim;

use crate::auth::extract_bearer;
use crate::state::AppState;

/// Verifies the handshake token from either the `Authorization` header or a
/// `token` query parameter (browsers cannot set arbitrary headers on a
/// `WebSocket` upgrade, so the query parameter is the practical path for
/// them; the header variant exists for parity with `driftline-test-utils`'s
/// mock client and non-browser callers). Missing or invalid tokens resolve
/// to the zero claim rather than an error -- spec.md §9's fail-soft
/// contract applies here too, since the chat namespace treats an empty
/// claim as "anonymous, join general" rather than a rejection.
pub fn verify_handshake(state: &AppState, headers: &HeaderMap, query_token: Option<&str>) -> SessionClaim {
    let header_token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer);
    match header_token.or(query_token) {
        Some(token) => state.token_issuer.verify(token),
        None => SessionClaim::default(),
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

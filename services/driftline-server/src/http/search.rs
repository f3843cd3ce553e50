//! Search-pool HTTP surface (spec.md §6): start/stop/poll against the
//! Queue Store, all gated on the Bearer token matching `:userId`.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use driftline_protocol::{DataEnvelope, Pool as SearchPool, StartSearchResponse};
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::authorize_user;
use crate::http::response::{bad_request, internal_error, not_found, HttpResult};
use crate::state::AppState;

fn parse_pool(raw: &str) -> Option<SearchPool> {
    match raw {
        "chat" => Some(SearchPool::Chat),
        "call" => Some(SearchPool::Call),
        _ => None,
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[derive(Debug, Deserialize)]
pub struct StartSearchBody {
    pub username: String,
    #[serde(default)]
    pub interests: Vec<String>,
}

pub async fn start_search(
    State(state): State<AppState>,
    Path((pool, user_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<StartSearchBody>,
) -> HttpResult<Json<DataEnvelope<StartSearchResponse>>> {
    authorize_user(&headers, &state, &user_id)?;
    let pool = parse_pool(&pool).ok_or_else(|| bad_request("unknown pool"))?;

    state
        .store
        .queue
        .enqueue(pool, &user_id, &body.username, &body.interests, now_ms())
        .await
        .map_err(internal_error)?;

    Ok(Json(DataEnvelope::new(StartSearchResponse { user: user_id })))
}

pub async fn stop_search(
    State(state): State<AppState>,
    Path((pool, user_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> HttpResult<()> {
    authorize_user(&headers, &state, &user_id)?;
    let pool = parse_pool(&pool).ok_or_else(|| bad_request("unknown pool"))?;
    state
        .store
        .queue
        .dequeue(pool, &user_id)
        .await
        .map_err(internal_error)?;
    Ok(())
}

pub async fn poll_match(
    State(state): State<AppState>,
    Path((pool, user_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> HttpResult<Json<DataEnvelope<driftline_protocol::MatchTuple>>> {
    authorize_user(&headers, &state, &user_id)?;
    let pool = parse_pool(&pool).ok_or_else(|| bad_request("unknown pool"))?;

    let tuple = state
        .store
        .match_tuple
        .take(pool, &user_id)
        .await
        .map_err(internal_error)?;

    match tuple {
        Some(tuple) => Ok(Json(DataEnvelope::new(tuple))),
        None => Err(not_found("no match yet")),
    }
}

//! `POST /api/v1/heartbeat` (spec.md §6): body/token carries `(roomId,
//! senderId)`; ingests one heartbeat against the Room-State Machine.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use driftline_match::{heartbeat_points, is_point_tick};
use driftline_protocol::{HeartbeatOutcome, HeartbeatResponse};
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::auth::authorize_user;
use crate::http::response::{bad_request, internal_error, HttpResult};
use crate::repo::users;
use crate::state::AppState;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatBody {
    pub room_id: String,
    pub sender_id: String,
}

pub async fn heartbeat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<HeartbeatBody>,
) -> HttpResult<Json<HeartbeatResponse>> {
    authorize_user(&headers, &state, &body.sender_id)?;

    let outcome = state
        .store
        .room_state
        .heartbeat(&body.room_id, &body.sender_id, now_ms())
        .await
        .map_err(internal_error)?;

    if outcome != HeartbeatOutcome::Ok {
        let message = match outcome {
            HeartbeatOutcome::RoomNotFound => "room not found",
            HeartbeatOutcome::UserNotInRoom => "user not in room",
            HeartbeatOutcome::Ok => unreachable!(),
        };
        return Err(bad_request(message));
    }

    let state_after = state
        .store
        .room_state
        .load(&body.room_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| bad_request("room not found"))?;

    let occupant = if state_after.user1.user_id == body.sender_id {
        &state_after.user1
    } else {
        &state_after.user2
    };

    if is_point_tick(occupant.count) {
        let points = heartbeat_points(occupant.count, state_after.room_type);
        if let Err(err) = users::add_points(&state.pool, &body.sender_id, points).await {
            warn!(user_id = %body.sender_id, error = %err, "failed to credit heartbeat points");
        }
    }

    Ok(Json(HeartbeatResponse {
        success: true,
        message: "ok".to_owned(),
        count: occupant.count,
        state: occupant.state,
    }))
}

//! Presence sweep job (spec.md §4.C): demotes stale occupants and deletes
//! any room where either side has gone fully `disconnected`.

use tracing::warn;

use crate::state::AppState;

/// Heartbeat timeout an occupant can go silent for before demotion
/// (spec.md §4.C, "now - lastHeartbeat > 10 s").
const OCCUPANT_TIMEOUT_MS: i64 = 10_000;

pub async fn run_tick(state: AppState) {
    let now = now_ms();

    let room_ids = match state.store.room_state.list_active().await {
        Ok(ids) => ids,
        Err(err) => {
            warn!(error = %err, "presence sweep: list_active failed");
            return;
        }
    };

    for room_id in room_ids {
        match state.store.room_state.sweep(&room_id, OCCUPANT_TIMEOUT_MS, now).await {
            Ok(_deleted) => {}
            Err(err) => warn!(room_id = %room_id, error = %err, "presence sweep: sweep failed"),
        }
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

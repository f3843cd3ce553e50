//! Redis-backed persistence for the two-party room state machine (spec.md
//! §4.C). The transition logic itself is pure and lives in
//! `driftline_match::room_state`; this module only loads/stores the JSON
//! blob and wraps the pure functions with the read-modify-write Redis
//! round trip.

use deadpool_redis::Pool;
use driftline_match::room_state as pure;
use driftline_protocol::{HeartbeatOutcome, RoomState, RoomType};
use redis::AsyncCommands;

use crate::error::StoreResult;
use crate::keys;

#[derive(Clone)]
pub struct RoomStateStore {
    pool: Pool,
}

impl RoomStateStore {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates a fresh two-party room, both occupants starting `Online`
    /// with `count = 0` (spec.md §4.C, room creation).
    pub async fn create(
        &self,
        room_id: &str,
        room_type: RoomType,
        user1_id: &str,
        user2_id: &str,
        now_ms: i64,
    ) -> StoreResult<RoomState> {
        use driftline_protocol::{OccupantState, RoomOccupant};
        let state = RoomState {
            room_id: room_id.to_owned(),
            room_type,
            user1: RoomOccupant {
                user_id: user1_id.to_owned(),
                last_heartbeat: now_ms,
                count: 0,
                state: OccupantState::Online,
            },
            user2: RoomOccupant {
                user_id: user2_id.to_owned(),
                last_heartbeat: now_ms,
                count: 0,
                state: OccupantState::Online,
            },
        };
        self.save(&state).await?;
        Ok(state)
    }

    pub async fn load(&self, room_id: &str) -> StoreResult<Option<RoomState>> {
        let mut conn = self.pool.get().await?;
        let payload: Option<String> = conn.get(keys::room_state(room_id)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, state: &RoomState) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let payload = serde_json::to_string(state)?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.set_ex(
            keys::room_state(&state.room_id),
            payload,
            keys::ROOM_CACHE_TTL_SECS as u64,
        );
        pipe.sadd(keys::active_rooms_set(), &state.room_id);
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn delete(&self, room_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(keys::room_state(room_id));
        pipe.srem(keys::active_rooms_set(), room_id);
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Every room id with a live `RoomState` record, for the presence-sweep
    /// scheduler to walk (spec.md §4.C, "Sweep (periodic, ... for every
    /// room record")).
    pub async fn list_active(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        let ids: Vec<String> = conn.smembers(keys::active_rooms_set()).await?;
        Ok(ids)
    }

    /// Loads, applies a heartbeat, and persists the result in one round
    /// trip (spec.md §4.C). Returns `RoomNotFound` without writing if the
    /// room is missing.
    pub async fn heartbeat(
        &self,
        room_id: &str,
        user_id: &str,
        now_ms: i64,
    ) -> StoreResult<HeartbeatOutcome> {
        let Some(mut state) = self.load(room_id).await? else {
            return Ok(HeartbeatOutcome::RoomNotFound);
        };
        let outcome = pure::heartbeat_room(&mut state, user_id, now_ms);
        if outcome == HeartbeatOutcome::Ok {
            self.save(&state).await?;
        }
        Ok(outcome)
    }

    /// Loads, sweeps both occupants for staleness, persists or deletes the
    /// room depending on the result (spec.md §4.C invariant, two-strike
    /// disconnect). Returns `true` if the room was deleted.
    pub async fn sweep(
        &self,
        room_id: &str,
        timeout_ms: i64,
        now_ms: i64,
    ) -> StoreResult<bool> {
        let Some(mut state) = self.load(room_id).await? else {
            // The JSON key already TTL-expired but the id is still in
            // `rooms:active` -- drop it from the index too, or every sweep
            // pass would keep re-discovering it forever.
            self.delete(room_id).await?;
            return Ok(true);
        };
        pure::sweep_occupant(&mut state.user1, now_ms, timeout_ms);
        pure::sweep_occupant(&mut state.user2, now_ms, timeout_ms);

        if pure::room_should_delete(&state) {
            self.delete(room_id).await?;
            Ok(true)
        } else {
            self.save(&state).await?;
            Ok(false)
        }
    }
}

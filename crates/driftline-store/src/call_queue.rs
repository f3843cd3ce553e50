//! Call-namespace anonymous pairing queue and room mapping (spec.md §4.F
//! "Call namespace (random pairing variant)"). Distinct from the Queue
//! Store (4.A): this queue holds raw socket ids, not user records, and
//! pairs on connect rather than on a scheduler tick.

use deadpool_redis::Pool;
use driftline_protocol::CallRoomRecord;
use redis::AsyncCommands;

use crate::error::StoreResult;
use crate::keys;

#[derive(Clone)]
pub struct CallQueueStore {
    pool: Pool,
}

impl CallQueueStore {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Pushes `socket_id` onto the waiting queue (spec.md §4.F, "push
    /// socket id to call:queue").
    pub async fn push(&self, socket_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.rpush(keys::call_queue(), socket_id).await?;
        Ok(())
    }

    /// Removes `socket_id` from the queue if it is still waiting
    /// (disconnect before a partner showed up).
    pub async fn remove(&self, socket_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let _: i64 = conn.lrem(keys::call_queue(), 0, socket_id).await?;
        Ok(())
    }

    /// Pops the two oldest waiting sockets if at least two are queued
    /// (spec.md §4.F, "If queue length >= 2, pop the two oldest"). The
    /// two `LPOP`s are not atomic with each other; if a concurrent caller
    /// wins the race for the second slot, the first pop is pushed back to
    /// the front so it is never silently dropped.
    pub async fn try_pop_pair(&self) -> StoreResult<Option<(String, String)>> {
        let mut conn = self.pool.get().await?;
        let len: i64 = conn.llen(keys::call_queue()).await?;
        if len < 2 {
            return Ok(None);
        }
        let first: Option<String> = conn.lpop(keys::call_queue(), None).await?;
        let Some(first) = first else {
            return Ok(None);
        };
        let second: Option<String> = conn.lpop(keys::call_queue(), None).await?;
        match second {
            Some(second) => Ok(Some((first, second))),
            None => {
                let _: () = conn.lpush(keys::call_queue(), &first).await?;
                Ok(None)
            }
        }
    }

    pub async fn map_socket_to_room(&self, socket_id: &str, room_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.set(keys::call_user_room(socket_id), room_id).await?;
        Ok(())
    }

    pub async fn room_id_for_socket(&self, socket_id: &str) -> StoreResult<Option<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.get(keys::call_user_room(socket_id)).await?)
    }

    pub async fn clear_socket_room(&self, socket_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.del(keys::call_user_room(socket_id)).await?;
        Ok(())
    }

    pub async fn save_room(&self, room: &CallRoomRecord) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let payload = serde_json::to_string(room)?;
        let _: () = conn.set(keys::call_room(&room.id), payload).await?;
        Ok(())
    }

    pub async fn load_room(&self, room_id: &str) -> StoreResult<Option<CallRoomRecord>> {
        let mut conn = self.pool.get().await?;
        let payload: Option<String> = conn.get(keys::call_room(room_id)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Ended rooms are deleted, not retained (spec.md §4.F "State
    /// machine"), so this also clears both participants' socket->room
    /// mapping in the same call.
    pub async fn end_room(&self, room: &CallRoomRecord) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(keys::call_room(&room.id));
        pipe.del(keys::call_user_room(&room.participant_a));
        pipe.del(keys::call_user_room(&room.participant_b));
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}

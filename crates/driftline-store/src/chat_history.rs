//! Bounded chat history buffers (spec.md §3 "Message" bounded log; §4.F
//! "append message id to a per-room recent-id list trimmed to 100"; §9
//! "General lobby" -- `roomId="general"` is retained only as this bounded
//! KV list, never as a durable Room/Message row).

use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::StoreResult;
use crate::keys;

#[derive(Clone)]
pub struct ChatHistoryStore {
    pool: Pool,
}

impl ChatHistoryStore {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Appends a serialized message to the general lobby's capped list.
    pub async fn push_general_message(&self, payload: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.lpush(keys::global_message_buffer(), payload);
        pipe.ltrim(keys::global_message_buffer(), 0, keys::GENERAL_ROOM_MAX_MESSAGES - 1);
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn recent_general_messages(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn
            .lrange(keys::global_message_buffer(), 0, keys::GENERAL_ROOM_MAX_MESSAGES - 1)
            .await?)
    }

    /// Appends `message_id` to `room_id`'s recent-id list, trimmed to 100
    /// (spec.md §4.F).
    pub async fn record_room_message_id(&self, room_id: &str, message_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let key = keys::chat_room_messages(room_id);
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.lpush(&key, message_id);
        pipe.ltrim(&key, 0, keys::CHAT_ROOM_RECENT_ID_CAP - 1);
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn recent_room_message_ids(&self, room_id: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn
            .lrange(keys::chat_room_messages(room_id), 0, keys::CHAT_ROOM_RECENT_ID_CAP - 1)
            .await?)
    }
}

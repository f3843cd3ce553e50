//! Read-through cache for the durable Room row (spec.md §4.B). The row
//! itself lives in Postgres; this only caches the serialized form with a
//! 24h TTL and is invalidated on any mutation.

use deadpool_redis::Pool;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreResult;
use crate::keys;

#[derive(Clone)]
pub struct RoomCacheStore {
    pool: Pool,
}

impl RoomCacheStore {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn get<T: DeserializeOwned>(&self, room_id: &str) -> StoreResult<Option<T>> {
        let mut conn = self.pool.get().await?;
        let payload: Option<String> = conn.get(keys::room_row_cache(room_id)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, room_id: &str, value: &T) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let payload = serde_json::to_string(value)?;
        let _: () = conn
            .set_ex(
                keys::room_row_cache(room_id),
                payload,
                keys::ROOM_CACHE_TTL_SECS as u64,
            )
            .await?;
        Ok(())
    }

    pub async fn invalidate(&self, room_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.del(keys::room_row_cache(room_id)).await?;
        Ok(())
    }
}

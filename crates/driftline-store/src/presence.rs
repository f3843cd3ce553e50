//! Presence tracking for the SSE notification bus (spec.md §4.F). A user
//! counts as "present" while they hold at least one open SSE connection;
//! multiple tabs/devices each bump a per-user connection counter so the
//! last one to disconnect is the one that clears presence.

use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::StoreResult;
use crate::keys;

#[derive(Clone)]
pub struct PresenceStore {
    pool: Pool,
}

impl PresenceStore {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Registers one more SSE connection for `user_id`, adding them to the
    /// presence set on the first connection.
    pub async fn connect(&self, user_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.sadd(keys::presence_set(), user_id);
        pipe.hincr(keys::presence_connections(), user_id, 1);
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Releases one SSE connection. Once a user's connection count drops
    /// to zero the counter field and the presence-set membership are both
    /// removed so a later `is_online` reflects reality immediately.
    pub async fn disconnect(&self, user_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let remaining: i64 = conn
            .hincr(keys::presence_connections(), user_id, -1)
            .await?;
        if remaining <= 0 {
            let mut pipe = redis::pipe();
            pipe.atomic();
            pipe.hdel(keys::presence_connections(), user_id);
            pipe.srem(keys::presence_set(), user_id);
            let _: () = pipe.query_async(&mut conn).await?;
        }
        Ok(())
    }

    pub async fn is_online(&self, user_id: &str) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;
        let online: bool = conn.sismember(keys::presence_set(), user_id).await?;
        Ok(online)
    }

    pub async fn online_users(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        let users: Vec<String> = conn.smembers(keys::presence_set()).await?;
        Ok(users)
    }
}

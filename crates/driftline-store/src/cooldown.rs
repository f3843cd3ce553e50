//! Cooldown flag (spec.md §4.A / §6): a short-lived key that blocks a user
//! from being rematched immediately after a room ends.

use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::StoreResult;
use crate::keys;

#[derive(Clone)]
pub struct CooldownStore {
    pool: Pool,
}

impl CooldownStore {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Sets the cooldown flag for `user_id`, expiring after
    /// `keys::COOLDOWN_TTL_SECS` (spec.md §6).
    pub async fn set(&self, user_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let _: () = conn
            .set_ex(keys::cooldown(user_id), 1, keys::COOLDOWN_TTL_SECS as u64)
            .await?;
        Ok(())
    }

    pub async fn is_active(&self, user_id: &str) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;
        let exists: bool = conn.exists(keys::cooldown(user_id)).await?;
        Ok(exists)
    }

    /// Bulk variant used by the matcher to build its `in_cooldown` closure
    /// with a single round trip instead of one `EXISTS` per candidate.
    pub async fn active_set(&self, user_ids: &[String]) -> StoreResult<std::collections::HashSet<String>> {
        if user_ids.is_empty() {
            return Ok(std::collections::HashSet::new());
        }
        let mut conn = self.pool.get().await?;
        let mut pipe = redis::pipe();
        for user_id in user_ids {
            pipe.exists(keys::cooldown(user_id));
        }
        let flags: Vec<bool> = pipe.query_async(&mut conn).await?;
        Ok(user_ids
            .iter()
            .zip(flags)
            .filter(|(_, active)| *active)
            .map(|(id, _)| id.clone())
            .collect())
    }
}

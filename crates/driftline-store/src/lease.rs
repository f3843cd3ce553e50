//! Distributed lease (spec.md §4.I, "exactly one worker runs each
//! scheduled job at a time"). Any worker can attempt to acquire; exactly
//! one wins per TTL window, the rest skip this tick rather than blocking.

use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::StoreResult;
use crate::keys;

#[derive(Clone)]
pub struct LeaseStore {
    pool: Pool,
}

impl LeaseStore {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Attempts to acquire the lease for `task_name`, tagged with
    /// `holder_id` (typically a process/instance id for diagnostics).
    /// Returns `true` if this call won the lease.
    pub async fn try_acquire(
        &self,
        task_name: &str,
        holder_id: &str,
        ttl_ms: u64,
    ) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;
        let won: Option<String> = redis::cmd("SET")
            .arg(keys::lease(task_name))
            .arg(holder_id)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(won.is_some())
    }

    /// Releases the lease early, but only if `holder_id` still holds it,
    /// so a worker can never clear a lease another worker has since won
    /// after this one's TTL lapsed and was re-acquired.
    pub async fn release(&self, task_name: &str, holder_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let key = keys::lease(task_name);
        let current: Option<String> = conn.get(&key).await?;
        if current.as_deref() == Some(holder_id) {
            let _: () = conn.del(&key).await?;
        }
        Ok(())
    }
}

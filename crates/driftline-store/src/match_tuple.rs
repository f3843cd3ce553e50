//! Match-tuple handoff (spec.md §4.A/§4.D): the matcher writes one tuple
//! per paired user; the user's next poll reads and deletes it exactly
//! once (spec.md invariant 5, "read-and-delete").

use deadpool_redis::Pool;
use driftline_protocol::{MatchTuple, Pool as SearchPool};
use redis::AsyncCommands;

use crate::error::StoreResult;
use crate::keys;

/// Match tuples outlive the pool-set TTLs comfortably but are not meant to
/// linger; a poller that never shows up leaves a small amount of garbage
/// that the subscription-expiry sweep (spec.md §4.I) is not responsible
/// for — this TTL bounds it independently.
pub const MATCH_TUPLE_TTL_SECS: i64 = 60;

#[derive(Clone)]
pub struct MatchTupleStore {
    pool: Pool,
}

impl MatchTupleStore {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Writes `tuple` for `user_id` in `pool`. Call sites pipeline this
    /// alongside the corresponding `dequeue` so a poll can never observe a
    /// user still sitting in the pool set with a tuple already written.
    pub async fn write(
        &self,
        pool: SearchPool,
        user_id: &str,
        tuple: &MatchTuple,
    ) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let payload = serde_json::to_string(tuple)?;
        let _: () = conn
            .set_ex(
                keys::match_tuple(pool, user_id),
                payload,
                MATCH_TUPLE_TTL_SECS as u64,
            )
            .await?;
        Ok(())
    }

    /// Atomically reads and deletes the tuple for `user_id`, returning
    /// `None` if no match has landed yet.
    pub async fn take(&self, pool: SearchPool, user_id: &str) -> StoreResult<Option<MatchTuple>> {
        let mut conn = self.pool.get().await?;
        let key = keys::match_tuple(pool, user_id);
        let payload: Option<String> = redis::cmd("GETDEL")
            .arg(&key)
            .query_async(&mut conn)
            .await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}

//! Queue Store (spec.md §4.A): the search pool, per-user hash, interest
//! memberships, and username index for one logical pool (`chat` or `call`).

use deadpool_redis::Pool;
use driftline_protocol::{Pool as SearchPool, SearchUser};
use redis::{AsyncCommands, RedisResult};
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::keys;

/// Default idle threshold for `sweep_inactive` (spec.md §4.A, "Default
/// threshold 30 s").
pub const DEFAULT_SWEEP_THRESHOLD_MS: i64 = 30_000;

#[derive(Clone)]
pub struct QueueStore {
    pool: Pool,
}

impl QueueStore {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Enqueues `user_id` into `pool`'s search pool, writing the pool set,
    /// the user hash, and every interest membership in one pipelined
    /// transaction (spec.md §4.A, "All writes happen in one pipelined
    /// transaction"). If `username` is already bound to a different id in
    /// the username index, the old id is fully removed first (same
    /// invariant S2 exercises).
    pub async fn enqueue(
        &self,
        pool: SearchPool,
        user_id: &str,
        username: &str,
        interests: &[String],
        joined_at_ms: i64,
    ) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        self.heal_legacy_sets(&mut conn, pool).await?;

        let username_key = keys::username_index(pool, username);
        let existing: Vec<String> = conn.smembers(&username_key).await?;
        for existing_id in existing {
            if existing_id != user_id {
                self.dequeue_with_conn(&mut conn, pool, &existing_id).await?;
            }
        }

        let mut pipe = redis::pipe();
        pipe.atomic();

        pipe.zadd(keys::pool_set(pool), user_id, joined_at_ms);

        let hash_key = keys::user_hash(pool, user_id);
        pipe.hset(&hash_key, "username", username);
        pipe.hset(&hash_key, "timestamp", joined_at_ms);
        pipe.hset(&hash_key, "lastHeartbeat", joined_at_ms);
        pipe.expire(&hash_key, keys::USER_HASH_TTL_SECS);

        let interests_key = keys::user_interests(pool, user_id);
        for (idx, tag) in interests.iter().enumerate() {
            pipe.zadd(&interests_key, tag, idx as i64);
        }
        pipe.expire(&interests_key, keys::USER_INTERESTS_TTL_SECS);

        for tag in interests {
            let interest_key = keys::interest_set(pool, tag);
            pipe.zadd(&interest_key, user_id, joined_at_ms);
            pipe.expire(&interest_key, keys::INTEREST_SET_TTL_SECS);
        }

        pipe.sadd(&username_key, user_id);
        pipe.expire(&username_key, keys::USERNAME_INDEX_TTL_SECS);

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Removes `user_id` from every per-pool container: interest
    /// memberships, the pool set, the hash, and the interests list
    /// (spec.md §4.A, "pipelined").
    pub async fn dequeue(&self, pool: SearchPool, user_id: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        self.dequeue_with_conn(&mut conn, pool, user_id).await
    }

    async fn dequeue_with_conn(
        &self,
        conn: &mut deadpool_redis::Connection,
        pool: SearchPool,
        user_id: &str,
    ) -> StoreResult<()> {
        let interests_key = keys::user_interests(pool, user_id);
        let interests: Vec<String> = conn.zrange(&interests_key, 0, -1).await?;

        let hash_key = keys::user_hash(pool, user_id);
        let username: Option<String> = conn.hget(&hash_key, "username").await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for tag in &interests {
            pipe.zrem(keys::interest_set(pool, tag), user_id);
        }
        pipe.zrem(keys::pool_set(pool), user_id);
        pipe.del(&hash_key);
        pipe.del(&interests_key);
        if let Some(username) = username {
            pipe.srem(keys::username_index(pool, &username), user_id);
        }
        let _: () = pipe.query_async(conn).await?;
        Ok(())
    }

    /// Dequeues `user_id` and writes their match tuple in the SAME pipelined
    /// transaction (spec.md §9, "Ordering vs. lifecycle": a client must
    /// never observe a user absent from the pool with no match tuple yet).
    /// `tuple_payload` is the already-serialized `MatchTuple` JSON.
    pub async fn dequeue_with_match_tuple(
        &self,
        pool: SearchPool,
        user_id: &str,
        tuple_payload: &str,
        tuple_ttl_secs: i64,
    ) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;

        let interests_key = keys::user_interests(pool, user_id);
        let interests: Vec<String> = conn.zrange(&interests_key, 0, -1).await?;
        let hash_key = keys::user_hash(pool, user_id);
        let username: Option<String> = conn.hget(&hash_key, "username").await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for tag in &interests {
            pipe.zrem(keys::interest_set(pool, tag), user_id);
        }
        pipe.zrem(keys::pool_set(pool), user_id);
        pipe.del(&hash_key);
        pipe.del(&interests_key);
        if let Some(username) = username {
            pipe.srem(keys::username_index(pool, &username), user_id);
        }
        pipe.set_ex(
            keys::match_tuple(pool, user_id),
            tuple_payload,
            u64::try_from(tuple_ttl_secs).unwrap_or(60),
        );
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Updates `lastHeartbeat` on the user hash only (spec.md §4.A).
    pub async fn heartbeat(
        &self,
        pool: SearchPool,
        user_id: &str,
        now_ms: i64,
    ) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let hash_key = keys::user_hash(pool, user_id);
        let exists: bool = conn.exists(&hash_key).await?;
        if exists {
            let _: () = conn.hset(&hash_key, "lastHeartbeat", now_ms).await?;
        }
        Ok(())
    }

    /// Removes every user whose `lastHeartbeat` (or `joinedAt` if absent)
    /// predates `now_ms - threshold_ms` (spec.md §4.A, invariant 3).
    /// Returns the ids removed.
    pub async fn sweep_inactive(
        &self,
        pool: SearchPool,
        threshold_ms: i64,
        now_ms: i64,
    ) -> StoreResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        self.heal_legacy_sets(&mut conn, pool).await?;

        let members: Vec<(String, i64)> =
            conn.zrange_withscores(keys::pool_set(pool), 0, -1).await?;

        let mut stale = Vec::new();
        for (user_id, joined_at) in members {
            let hash_key = keys::user_hash(pool, &user_id);
            let last_heartbeat: Option<i64> = conn.hget(&hash_key, "lastHeartbeat").await?;
            let effective = last_heartbeat.unwrap_or(joined_at);
            if now_ms - effective > threshold_ms {
                stale.push(user_id);
            }
        }

        for user_id in &stale {
            self.dequeue_with_conn(&mut conn, pool, user_id).await?;
        }
        if !stale.is_empty() {
            debug!(pool = %pool, count = stale.len(), "swept inactive users");
        }
        Ok(stale)
    }

    /// All live pool members, sorted by ascending `joinedAt` (spec.md
    /// §4.A).
    pub async fn list_available(&self, pool: SearchPool) -> StoreResult<Vec<SearchUser>> {
        let mut conn = self.pool.get().await?;
        self.heal_legacy_sets(&mut conn, pool).await?;

        let members: Vec<(String, i64)> =
            conn.zrange_withscores(keys::pool_set(pool), 0, -1).await?;

        let mut users = Vec::with_capacity(members.len());
        for (user_id, joined_at) in members {
            let hash_key = keys::user_hash(pool, &user_id);
            let username: Option<String> = conn.hget(&hash_key, "username").await?;
            let last_heartbeat: Option<i64> = conn.hget(&hash_key, "lastHeartbeat").await?;
            let Some(username) = username else {
                // Hash expired out from under the pool set (TTL skew);
                // treat as absent rather than fabricating a user.
                continue;
            };
            let interests_key = keys::user_interests(pool, &user_id);
            let interests: Vec<String> = conn.zrange(&interests_key, 0, -1).await?;
            users.push(SearchUser {
                id: user_id,
                username,
                interests,
                joined_at,
                last_heartbeat: last_heartbeat.unwrap_or(joined_at),
            });
        }
        Ok(users)
    }

    /// Detects a legacy plain-set representation of the pool set and
    /// upgrades it in place to a sorted set scored by `now`, so the sweep
    /// and matcher can keep relying on score-ordered reads (spec.md §4.A,
    /// §9 "Legacy set vs. sorted-set").
    async fn heal_legacy_sets(
        &self,
        conn: &mut deadpool_redis::Connection,
        pool: SearchPool,
    ) -> StoreResult<()> {
        let key = keys::pool_set(pool);
        let type_name: String = redis::cmd("TYPE").arg(&key).query_async(conn).await?;
        if type_name != "set" {
            return Ok(());
        }
        warn!(pool = %pool, "upgrading legacy plain-set pool to sorted set");
        let members: Vec<String> = conn.smembers(&key).await?;
        if members.is_empty() {
            let _: RedisResult<()> = conn.del(&key).await;
            return Ok(());
        }
        let now = now_ms();
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(&key);
        for member in members {
            pipe.zadd(&key, member, now);
        }
        let _: () = pipe.query_async(conn).await?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Intersection of two interest lists (spec.md §4.A, `commonInterests`).
/// Delegates to `driftline-match`'s pure implementation so the store and
/// the matcher agree on exactly one definition of "overlap".
#[must_use]
pub fn common_interests(a: &[String], b: &[String]) -> Vec<String> {
    driftline_match::pairing::common_interests(a, b)
}

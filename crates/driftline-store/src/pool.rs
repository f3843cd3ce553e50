use deadpool_redis::{Config, Pool, Runtime};

use crate::error::StoreResult;

/// Builds a pooled Redis connection manager from a `redis://` URL, the same
/// construction the `deadpool_redis` idiom uses everywhere in the corpus
/// (`Config::from_url(...).create_pool(Some(Runtime::Tokio1))`).
pub fn build_pool(redis_url: &str) -> StoreResult<Pool> {
    let cfg = Config::from_url(redis_url);
    let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
    Ok(pool)
}

//! Pub/Sub fabric (spec.md §4.G): cross-worker fan-out for chat messages,
//! room membership changes, and per-user SSE pushes. Publishing reuses the
//! pooled connection manager; subscribing needs a dedicated connection
//! since Redis pub/sub parks the connection for the life of the
//! subscription, so that side opens its own `redis::Client`.

use deadpool_redis::Pool;
use redis::aio::PubSub;
use redis::AsyncCommands;

use crate::error::StoreResult;
use crate::keys;

#[derive(Clone)]
pub struct PubSubPublisher {
    pool: Pool,
}

impl PubSubPublisher {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn publish(&self, channel: &str, payload: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let _: i64 = conn.publish(channel, payload).await?;
        Ok(())
    }

    pub async fn publish_chat_message(&self, payload: &str) -> StoreResult<()> {
        self.publish(keys::CHAT_MESSAGES_CHANNEL, payload).await
    }

    pub async fn publish_room_event(&self, payload: &str) -> StoreResult<()> {
        self.publish(keys::CHAT_ROOMS_CHANNEL, payload).await
    }

    pub async fn publish_to_user(&self, user_id: &str, payload: &str) -> StoreResult<()> {
        self.publish(&keys::sse_channel(user_id), payload).await
    }

    pub async fn publish_call_signal(&self, payload: &str) -> StoreResult<()> {
        self.publish(keys::CALL_SIGNAL_CHANNEL, payload).await
    }
}

/// Opens a dedicated pub/sub connection and subscribes to `channels`.
/// Callers drive `on_message()`/`into_on_message()` on the result
/// themselves; this mirrors the teacher's pattern of handing back a
/// long-lived stream rather than a callback.
pub async fn subscribe(redis_url: &str, channels: &[&str]) -> StoreResult<PubSub> {
    let client = redis::Client::open(redis_url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    for channel in channels {
        pubsub.subscribe(*channel).await?;
    }
    Ok(pubsub)
}

/// Subscribes to a single user's private SSE channel, used by the SSE
/// endpoint handler when a client connects (spec.md §4.F).
pub async fn subscribe_user(redis_url: &str, user_id: &str) -> StoreResult<PubSub> {
    subscribe(redis_url, &[&keys::sse_channel(user_id)]).await
}

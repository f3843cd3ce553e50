//! Redis-backed storage for the queue, match-tuple handoff, room-state
//! machine, presence, cooldown, distributed leases, and pub/sub fabric
//! (spec.md §4.A, §4.C, §4.F, §4.G, §4.I). Built on `deadpool_redis` the
//! same way `services/server`'s `db.rs` builds its Postgres pool: one
//! `Config::from_url(...).create_pool(...)` at boot, cloned cheaply into
//! every handler and background task.

pub mod call_queue;
pub mod chat_history;
pub mod cooldown;
pub mod error;
pub mod keys;
pub mod lease;
pub mod match_tuple;
pub mod pool;
pub mod presence;
pub mod pubsub;
pub mod queue;
pub mod room_cache;
pub mod room_state;

pub use call_queue::CallQueueStore;
pub use chat_history::ChatHistoryStore;
pub use cooldown::CooldownStore;
pub use error::{StoreError, StoreResult};
pub use lease::LeaseStore;
pub use match_tuple::MatchTupleStore;
pub use presence::PresenceStore;
pub use pubsub::PubSubPublisher;
pub use queue::QueueStore;
pub use room_cache::RoomCacheStore;
pub use room_state::RoomStateStore;

/// All the Redis-backed stores bundled together, sharing one connection
/// pool. `services/driftline-server`'s `AppState` holds one of these.
#[derive(Clone)]
pub struct Store {
    pub queue: QueueStore,
    pub cooldown: CooldownStore,
    pub match_tuple: MatchTupleStore,
    pub room_state: RoomStateStore,
    pub room_cache: RoomCacheStore,
    pub presence: PresenceStore,
    pub lease: LeaseStore,
    pub pubsub: PubSubPublisher,
    pub call_queue: CallQueueStore,
    pub chat_history: ChatHistoryStore,
}

impl Store {
    /// Builds every sub-store from one shared pool (spec.md §6 KV layout
    /// is entirely single-database; no per-concern Redis instance).
    pub fn new(redis_url: &str) -> StoreResult<Self> {
        let pool = pool::build_pool(redis_url)?;
        Ok(Self {
            queue: QueueStore::new(pool.clone()),
            cooldown: CooldownStore::new(pool.clone()),
            match_tuple: MatchTupleStore::new(pool.clone()),
            room_state: RoomStateStore::new(pool.clone()),
            room_cache: RoomCacheStore::new(pool.clone()),
            presence: PresenceStore::new(pool.clone()),
            lease: LeaseStore::new(pool.clone()),
            pubsub: PubSubPublisher::new(pool.clone()),
            call_queue: CallQueueStore::new(pool.clone()),
            chat_history: ChatHistoryStore::new(pool),
        })
    }
}

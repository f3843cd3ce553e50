//! Integration tests for the smaller Redis-backed stores: cooldown,
//! match-tuple handoff, room state, presence, and the distributed lease.
use driftline_protocol::{MatchTuple, Pool, RoomType};
use driftline_store::cooldown::CooldownStore;
use driftline_store::lease::LeaseStore;
use driftline_store::match_tuple::MatchTupleStore;
use driftline_store::presence::PresenceStore;
use driftline_store::room_state::RoomStateStore;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::redis::Redis;

async fn redis_url() -> (testcontainers::ContainerAsync<Redis>, String) {
    let container = Redis::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(6379).await.unwrap();
    (container, format!("redis://127.0.0.1:{port}"))
}

#[tokio::test]
async fn cooldown_expires_after_set_and_reports_active_meanwhile() {
    let (_container, url) = redis_url().await;
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    let store = CooldownStore::new(pool);

    assert!(!store.is_active("u1").await.unwrap());
    store.set("u1").await.unwrap();
    assert!(store.is_active("u1").await.unwrap());

    let active = store
        .active_set(&["u1".to_owned(), "u2".to_owned()])
        .await
        .unwrap();
    assert!(active.contains("u1"));
    assert!(!active.contains("u2"));
}

#[tokio::test]
async fn match_tuple_is_consumed_exactly_once() {
    let (_container, url) = redis_url().await;
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    let store = MatchTupleStore::new(pool);

    let tuple = MatchTuple {
        peer_user_id: "u2".to_owned(),
        token: "tok".to_owned(),
        room_id: "r1".to_owned(),
        is_friend: false,
    };
    store.write(Pool::Chat, "u1", &tuple).await.unwrap();

    let first = store.take(Pool::Chat, "u1").await.unwrap();
    assert_eq!(first, Some(tuple));

    let second = store.take(Pool::Chat, "u1").await.unwrap();
    assert_eq!(second, None);
}

#[tokio::test]
async fn room_state_heartbeat_and_sweep_round_trip() {
    let (_container, url) = redis_url().await;
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    let store = RoomStateStore::new(pool);

    store
        .create("r1", RoomType::Chat, "u1", "u2", 0)
        .await
        .unwrap();
    assert_eq!(store.list_active().await.unwrap(), vec!["r1".to_owned()]);

    let outcome = store.heartbeat("r1", "u1", 5_000).await.unwrap();
    assert_eq!(outcome, driftline_protocol::HeartbeatOutcome::Ok);

    let loaded = store.load("r1").await.unwrap().unwrap();
    assert_eq!(loaded.user1.last_heartbeat, 5_000);
    assert_eq!(loaded.user1.count, 1);

    // Neither occupant has heartbeat since 5_000; a sweep two windows out
    // should delete the room once both reach `disconnected`.
    let deleted_first = store.sweep("r1", 10_000, 15_000).await.unwrap();
    assert!(!deleted_first);
    assert_eq!(store.list_active().await.unwrap(), vec!["r1".to_owned()]);
    let deleted_second = store.sweep("r1", 10_000, 30_000).await.unwrap();
    assert!(deleted_second);
    assert!(store.load("r1").await.unwrap().is_none());
    assert!(store.list_active().await.unwrap().is_empty());
}

#[tokio::test]
async fn presence_tracks_multiple_connections_per_user() {
    let (_container, url) = redis_url().await;
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    let store = PresenceStore::new(pool);

    store.connect("u1").await.unwrap();
    store.connect("u1").await.unwrap();
    assert!(store.is_online("u1").await.unwrap());

    store.disconnect("u1").await.unwrap();
    assert!(store.is_online("u1").await.unwrap());

    store.disconnect("u1").await.unwrap();
    assert!(!store.is_online("u1").await.unwrap());
}

#[tokio::test]
async fn lease_is_exclusive_until_released() {
    let (_container, url) = redis_url().await;
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    let store = LeaseStore::new(pool);

    assert!(store.try_acquire("matcher", "worker-a", 10_000).await.unwrap());
    assert!(!store.try_acquire("matcher", "worker-b", 10_000).await.unwrap());

    store.release("matcher", "worker-a").await.unwrap();
    assert!(store.try_acquire("matcher", "worker-b", 10_000).await.unwrap());
}

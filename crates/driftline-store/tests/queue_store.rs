//! Integration tests for the Redis-backed queue store, run against a
//! disposable Redis container.
use driftline_protocol::Pool;
use driftline_store::queue::QueueStore;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::redis::Redis;

async fn make_store() -> (testcontainers::ContainerAsync<Redis>, QueueStore) {
    let container = Redis::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(6379).await.unwrap();
    let url = format!("redis://127.0.0.1:{port}");
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    (container, QueueStore::new(pool))
}

#[tokio::test]
async fn enqueue_then_list_available_reflects_the_user() {
    let (_container, store) = make_store().await;
    store
        .enqueue(
            Pool::Chat,
            "u1",
            "alice",
            &["music".to_owned(), "chess".to_owned()],
            1_000,
        )
        .await
        .unwrap();

    let users = store.list_available(Pool::Chat).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "u1");
    assert_eq!(users[0].username, "alice");
    assert_eq!(users[0].interests, vec!["music", "chess"]);
}

#[tokio::test]
async fn dequeue_removes_user_from_every_container() {
    let (_container, store) = make_store().await;
    store
        .enqueue(Pool::Chat, "u1", "alice", &["music".to_owned()], 1_000)
        .await
        .unwrap();
    store.dequeue(Pool::Chat, "u1").await.unwrap();

    let users = store.list_available(Pool::Chat).await.unwrap();
    assert!(users.is_empty());
}

#[tokio::test]
async fn reenqueue_with_same_username_evicts_the_previous_id() {
    let (_container, store) = make_store().await;
    store
        .enqueue(Pool::Chat, "u1", "alice", &["music".to_owned()], 1_000)
        .await
        .unwrap();
    store
        .enqueue(Pool::Chat, "u2", "alice", &["chess".to_owned()], 2_000)
        .await
        .unwrap();

    let users = store.list_available(Pool::Chat).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "u2");
}

#[tokio::test]
async fn sweep_inactive_evicts_past_threshold_only() {
    let (_container, store) = make_store().await;
    store
        .enqueue(Pool::Chat, "stale", "alice", &[], 0)
        .await
        .unwrap();
    store
        .enqueue(Pool::Chat, "fresh", "bob", &[], 50_000)
        .await
        .unwrap();

    let removed = store
        .sweep_inactive(Pool::Chat, 30_000, 60_000)
        .await
        .unwrap();
    assert_eq!(removed, vec!["stale".to_owned()]);

    let users = store.list_available(Pool::Chat).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "fresh");
}

#[tokio::test]
async fn dequeue_with_match_tuple_removes_user_and_writes_tuple_atomically() {
    let container = Redis::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(6379).await.unwrap();
    let url = format!("redis://127.0.0.1:{port}");
    let store = QueueStore::new(driftline_store::pool::build_pool(&url).unwrap());
    let match_tuple_store = driftline_store::match_tuple::MatchTupleStore::new(
        driftline_store::pool::build_pool(&url).unwrap(),
    );

    store
        .enqueue(Pool::Chat, "u1", "alice", &["music".to_owned()], 1_000)
        .await
        .unwrap();

    let tuple = driftline_protocol::MatchTuple {
        peer_user_id: "u2".to_owned(),
        token: "tok".to_owned(),
        room_id: "r1".to_owned(),
        is_friend: false,
    };
    store
        .dequeue_with_match_tuple(
            Pool::Chat,
            "u1",
            &serde_json::to_string(&tuple).unwrap(),
            60,
        )
        .await
        .unwrap();

    let users = store.list_available(Pool::Chat).await.unwrap();
    assert!(users.is_empty());

    let fetched = match_tuple_store.take(Pool::Chat, "u1").await.unwrap();
    assert_eq!(fetched, Some(tuple));
}

#[tokio::test]
async fn heartbeat_keeps_a_user_out_of_the_sweep() {
    let (_container, store) = make_store().await;
    store
        .enqueue(Pool::Chat, "u1", "alice", &[], 0)
        .await
        .unwrap();
    store.heartbeat(Pool::Chat, "u1", 55_000).await.unwrap();

    let removed = store
        .sweep_inactive(Pool::Chat, 30_000, 60_000)
        .await
        .unwrap();
    assert!(removed.is_empty());
}

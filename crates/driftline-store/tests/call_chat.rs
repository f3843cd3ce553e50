//! Integration tests for the call-queue pairing store and the bounded
//! chat-history buffers, run against a disposable Redis container.
use driftline_protocol::{CallRoomRecord, CallRoomStatus};
use driftline_store::call_queue::CallQueueStore;
use driftline_store::chat_history::ChatHistoryStore;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::redis::Redis;

async fn redis_url() -> (testcontainers::ContainerAsync<Redis>, String) {
    let container = Redis::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(6379).await.unwrap();
    (container, format!("redis://127.0.0.1:{port}"))
}

#[tokio::test]
async fn try_pop_pair_pops_nothing_below_two_waiting_sockets() {
    let (_container, url) = redis_url().await;
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    let store = CallQueueStore::new(pool);

    store.push("s1").await.unwrap();
    assert_eq!(store.try_pop_pair().await.unwrap(), None);

    store.push("s2").await.unwrap();
    let pair = store.try_pop_pair().await.unwrap();
    assert_eq!(pair, Some(("s1".to_owned(), "s2".to_owned())));
}

#[tokio::test]
async fn remove_drops_a_socket_still_waiting() {
    let (_container, url) = redis_url().await;
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    let store = CallQueueStore::new(pool);

    store.push("s1").await.unwrap();
    store.remove("s1").await.unwrap();
    store.push("s2").await.unwrap();
    assert_eq!(store.try_pop_pair().await.unwrap(), None);
}

#[tokio::test]
async fn save_load_and_end_room_round_trip() {
    let (_container, url) = redis_url().await;
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    let store = CallQueueStore::new(pool);

    let room = CallRoomRecord {
        id: "r1".to_owned(),
        participant_a: "a".to_owned(),
        participant_b: "b".to_owned(),
        status: CallRoomStatus::Active,
        start_time_ms: 1_000,
    };
    store.save_room(&room).await.unwrap();
    store.map_socket_to_room("a", "r1").await.unwrap();
    store.map_socket_to_room("b", "r1").await.unwrap();

    assert_eq!(store.load_room("r1").await.unwrap(), Some(room.clone()));
    assert_eq!(store.room_id_for_socket("a").await.unwrap(), Some("r1".to_owned()));

    store.end_room(&room).await.unwrap();
    assert_eq!(store.load_room("r1").await.unwrap(), None);
    assert_eq!(store.room_id_for_socket("a").await.unwrap(), None);
    assert_eq!(store.room_id_for_socket("b").await.unwrap(), None);
}

#[tokio::test]
async fn general_message_buffer_trims_to_cap() {
    let (_container, url) = redis_url().await;
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    let store = ChatHistoryStore::new(pool);

    for i in 0..105 {
        store.push_general_message(&format!("msg-{i}")).await.unwrap();
    }

    let recent = store.recent_general_messages().await.unwrap();
    assert_eq!(recent.len(), 100);
    // Most recent push is at the head.
    assert_eq!(recent[0], "msg-104");
}

#[tokio::test]
async fn room_message_ids_trim_to_cap_and_preserve_recency_order() {
    let (_container, url) = redis_url().await;
    let pool = driftline_store::pool::build_pool(&url).unwrap();
    let store = ChatHistoryStore::new(pool);

    store.record_room_message_id("room-1", "m1").await.unwrap();
    store.record_room_message_id("room-1", "m2").await.unwrap();
    store.record_room_message_id("room-1", "m3").await.unwrap();

    let ids = store.recent_room_message_ids("room-1").await.unwrap();
    assert_eq!(ids, vec!["m3", "m2", "m1"]);
}

//! Redis key layout (spec.md §6, "KV key layout"). Centralized here so no
//! call site hand-builds a key string.

use driftline_protocol::Pool;

pub fn pool_set(pool: Pool) -> String {
    format!("users:{pool}")
}

pub fn user_hash(pool: Pool, user_id: &str) -> String {
    format!("user:{pool}:{user_id}")
}

pub fn interest_set(pool: Pool, tag: &str) -> String {
    format!("interest:{pool}:{tag}")
}

pub fn user_interests(pool: Pool, user_id: &str) -> String {
    format!("user_interests:{pool}:{user_id}")
}

pub fn username_index(pool: Pool, username: &str) -> String {
    format!("users:{pool}:index:username:{username}")
}

pub fn cooldown(user_id: &str) -> String {
    format!("user_prevent_match:{user_id}")
}

pub fn match_tuple(pool: Pool, user_id: &str) -> String {
    format!("match:{pool}:{user_id}")
}

pub fn room_state(room_id: &str) -> String {
    format!("room:{room_id}")
}

/// Read-through cache for the durable Room row (spec.md §4.B), distinct
/// from the ephemeral presence record at `room_state` even though both
/// describe "room:<roomId>" loosely in spec.md §6 -- kept separate here so
/// a RoomState write can never shadow the durable row's cache entry.
pub fn room_row_cache(room_id: &str) -> String {
    format!("room_row:{room_id}")
}

pub fn call_queue() -> &'static str {
    "call:queue"
}

pub fn call_user(socket_id: &str) -> String {
    format!("call:user:{socket_id}")
}

pub fn call_room(room_id: &str) -> String {
    format!("call:room:{room_id}")
}

pub fn call_user_room(socket_id: &str) -> String {
    format!("call:user-room:{socket_id}")
}

pub fn chat_room_sockets(room_id: &str) -> String {
    format!("chat:rooms:{room_id}")
}

pub fn chat_socket_rooms(socket_id: &str) -> String {
    format!("chat:socket:{socket_id}:rooms")
}

pub fn chat_room_messages(room_id: &str) -> String {
    format!("chat:room:{room_id}:messages")
}

pub fn global_message_buffer() -> &'static str {
    "global:message"
}

pub fn presence_set() -> &'static str {
    "sse:users"
}

pub fn presence_connections() -> &'static str {
    "sse:user:connections"
}

pub fn sse_channel(user_id: &str) -> String {
    format!("sse:user:{user_id}")
}

pub fn lease(task_name: &str) -> String {
    format!("lock:{task_name}")
}

/// Membership index over every live `room:<roomId>` record, so the
/// presence-sweep scheduler (spec.md §4.C, §4.I) can enumerate rooms to
/// sweep without a `SCAN` over the whole keyspace. Not named in spec.md
/// §6's key list, which predates needing enumeration; kept in the same
/// style as `presence_set` (a plain set of ids alongside the ephemeral
/// records it indexes).
pub fn active_rooms_set() -> &'static str {
    "rooms:active"
}

pub const CHAT_MESSAGES_CHANNEL: &str = "chat:messages";
pub const CHAT_ROOMS_CHANNEL: &str = "chat:rooms";

/// Cross-worker relay channel for `/ws/call` signaling (spec.md §9,
/// "pub/sub + local emit composition"); not named in spec.md §6's channel
/// list since that list predates the call namespace needing cross-worker
/// delivery, but required by the same design note for the chat namespace.
pub const CALL_SIGNAL_CHANNEL: &str = "call:signal";

pub const GENERAL_ROOM_ID: &str = "general";
pub const GENERAL_ROOM_MAX_MESSAGES: isize = 100;
pub const CHAT_ROOM_RECENT_ID_CAP: isize = 100;

/// TTLs named in spec.md §6.
pub const USER_HASH_TTL_SECS: i64 = 120;
pub const INTEREST_SET_TTL_SECS: i64 = 150;
pub const USER_INTERESTS_TTL_SECS: i64 = 120;
pub const USERNAME_INDEX_TTL_SECS: i64 = 120;
pub const COOLDOWN_TTL_SECS: i64 = 7;
pub const ROOM_CACHE_TTL_SECS: i64 = 24 * 60 * 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_the_documented_layout() {
        assert_eq!(pool_set(Pool::Chat), "users:chat");
        assert_eq!(user_hash(Pool::Call, "u1"), "user:call:u1");
        assert_eq!(interest_set(Pool::Chat, "music"), "interest:chat:music");
        assert_eq!(
            user_interests(Pool::Chat, "u1"),
            "user_interests:chat:u1"
        );
        assert_eq!(
            username_index(Pool::Chat, "alice"),
            "users:chat:index:username:alice"
        );
        assert_eq!(cooldown("u1"), "user_prevent_match:u1");
        assert_eq!(match_tuple(Pool::Chat, "u1"), "match:chat:u1");
        assert_eq!(room_state("r1"), "room:r1");
        assert_eq!(lease("match-job"), "lock:match-job");
    }
}

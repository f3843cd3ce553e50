//! Matcher job (spec.md §4.D): per tick, per pool, sweep the idle and pair
//! the rest by interest overlap with a random fallback for the remainder.

use driftline_match::{greedy_match, random_match, Candidate};
use driftline_protocol::{CallRoomRecord, CallRoomStatus, MatchTuple, Pool as SearchPool, RoomType, SearchUser, SessionClaim};
use driftline_store::queue::DEFAULT_SWEEP_THRESHOLD_MS;
use rand::thread_rng;
use tracing::warn;

use crate::repo::{friendships, rooms as rooms_repo};
use crate::state::AppState;

/// Friend-chat tokens effectively never expire (spec.md §4.E); everything
/// else gets the issuer's default 7-day TTL.
const FRIEND_TOKEN_TTL: Option<i64> = None;

pub async fn run_tick(state: AppState) {
    run_pool(&state, SearchPool::Chat, RoomType::Chat).await;
    run_pool(&state, SearchPool::Call, RoomType::Call).await;
}

async fn run_pool(state: &AppState, pool: SearchPool, room_type: RoomType) {
    let now = now_ms();

    if let Err(err) = state.store.queue.sweep_inactive(pool, DEFAULT_SWEEP_THRESHOLD_MS, now).await {
        warn!(pool = %pool, error = %err, "matcher: sweep_inactive failed");
        return;
    }

    let available = match state.store.queue.list_available(pool).await {
        Ok(users) => users,
        Err(err) => {
            warn!(pool = %pool, error = %err, "matcher: list_available failed");
            return;
        }
    };
    if available.len() < 2 {
        return;
    }

    let ids: Vec<String> = available.iter().map(|u| u.id.clone()).collect();
    let cooldown_set = match state.store.cooldown.active_set(&ids).await {
        Ok(set) => set,
        Err(err) => {
            warn!(pool = %pool, error = %err, "matcher: cooldown lookup failed");
            Default::default()
        }
    };
    let in_cooldown = |id: &str| cooldown_set.contains(id);

    let candidates: Vec<Candidate> = available
        .iter()
        .map(|u| Candidate {
            id: u.id.clone(),
            username: u.username.clone(),
            interests: u.interests.clone(),
            joined_at: u.joined_at,
        })
        .collect();
    let by_id: std::collections::HashMap<&str, &SearchUser> =
        available.iter().map(|u| (u.id.as_str(), u)).collect();

    let (greedy_pairs, remaining) = greedy_match(&candidates, in_cooldown);
    let mut rng = thread_rng();
    let (random_pairs, _still_queued) = random_match(remaining, &mut rng, in_cooldown);

    for pair in greedy_pairs.into_iter().chain(random_pairs) {
        let Some(a) = by_id.get(pair.a.as_str()) else { continue };
        let Some(b) = by_id.get(pair.b.as_str()) else { continue };
        set_match(state, pool, room_type, a, b).await;
    }
}

async fn set_match(state: &AppState, pool: SearchPool, room_type: RoomType, a: &SearchUser, b: &SearchUser) {
    let is_friend = friendships::is_friend(&state.pool, &a.id, &b.id).await.unwrap_or(false);

    let room = match rooms_repo::create_room(&state.pool, &state.store.room_cache, &a.id, &b.id, None, None, room_type).await {
        Ok(room) => room,
        Err(err) => {
            warn!(pool = %pool, a = %a.id, b = %b.id, error = %err, "matcher: create_room failed, leaving both queued");
            return;
        }
    };

    if let Err(err) = state.store.room_state.create(&room.room_id, room_type, &a.id, &b.id, now_ms()).await {
        warn!(room_id = %room.room_id, error = %err, "matcher: room_state.create failed");
    }

    let token_ttl = if is_friend { FRIEND_TOKEN_TTL } else { Some(driftline_auth::DEFAULT_TTL_SECS) };
    let token_a = state.token_issuer.sign_with_ttl(
        SessionClaim {
            sender_id: a.id.clone(),
            receiver_id: b.id.clone(),
            room_id: room.room_id.clone(),
            sender_username: Some(a.username.clone()),
            receiver_username: Some(b.username.clone()),
            expires_at: 0,
        },
        token_ttl,
    );
    let token_b = state.token_issuer.sign_with_ttl(
        SessionClaim {
            sender_id: b.id.clone(),
            receiver_id: a.id.clone(),
            room_id: room.room_id.clone(),
            sender_username: Some(b.username.clone()),
            receiver_username: Some(a.username.clone()),
            expires_at: 0,
        },
        token_ttl,
    );

    let tuple_a = MatchTuple { peer_user_id: b.id.clone(), token: token_a, room_id: room.room_id.clone(), is_friend };
    let tuple_b = MatchTuple { peer_user_id: a.id.clone(), token: token_b, room_id: room.room_id.clone(), is_friend };

    // Dequeue and match-tuple write happen together in one pipelined
    // transaction per user (spec.md §9) so a concurrent poll can never see
    // "not queued and no match" for either endpoint.
    match serde_json::to_string(&tuple_a) {
        Ok(payload) => {
            if let Err(err) = state
                .store
                .queue
                .dequeue_with_match_tuple(pool, &a.id, &payload, driftline_store::match_tuple::MATCH_TUPLE_TTL_SECS)
                .await
            {
                warn!(user_id = %a.id, error = %err, "matcher: dequeue_with_match_tuple failed");
            }
        }
        Err(err) => warn!(user_id = %a.id, error = %err, "matcher: failed to encode match tuple"),
    }
    match serde_json::to_string(&tuple_b) {
        Ok(payload) => {
            if let Err(err) = state
                .store
                .queue
                .dequeue_with_match_tuple(pool, &b.id, &payload, driftline_store::match_tuple::MATCH_TUPLE_TTL_SECS)
                .await
            {
                warn!(user_id = %b.id, error = %err, "matcher: dequeue_with_match_tuple failed");
            }
        }
        Err(err) => warn!(user_id = %b.id, error = %err, "matcher: failed to encode match tuple"),
    }

    if let Err(err) = state.store.cooldown.set(&a.id).await {
        warn!(user_id = %a.id, error = %err, "matcher: cooldown.set failed");
    }
    if let Err(err) = state.store.cooldown.set(&b.id).await {
        warn!(user_id = %b.id, error = %err, "matcher: cooldown.set failed");
    }

    // Pre-create the call-signaling room so `/ws/call`'s token-mode path
    // (ws::call::ensure_token_room) finds it already populated rather than
    // racing its own fallback creation on first connect.
    if pool == SearchPool::Call {
        let call_room = CallRoomRecord {
            id: room.room_id.clone(),
            participant_a: a.id.clone(),
            participant_b: b.id.clone(),
            status: CallRoomStatus::Active,
            start_time_ms: now_ms(),
        };
        if let Err(err) = state.store.call_queue.save_room(&call_room).await {
            warn!(room_id = %room.room_id, error = %err, "matcher: failed to pre-create call room");
        }
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

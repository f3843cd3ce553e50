//! `/ws/call` namespace (spec.md §4.F "Call namespace (random pairing
//! variant)", §9 Open Question (ii) token-mode variant).

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use driftline_match::TokenBucket;
use driftline_protocol::{
    error_codes, CallEvent, CallRoomRecord, CallRoomStatus, CallSignalEnvelope, ErrorMessage,
    LobbyStatus, SessionClaim,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::repo::calls as calls_repo;
use crate::state::AppState;
use crate::ws::{now_ms, verify_handshake};

const RATE_LIMIT_CAPACITY: u32 = 10;
const RATE_LIMIT_PER_SEC: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct CallQuery {
    pub token: Option<String>,
}

pub async fn call_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallQuery>,
) -> impl IntoResponse {
    let claim = verify_handshake(&state, &headers, query.token.as_deref());
    ws.on_upgrade(move |socket| handle_call_socket(socket, state, claim))
}

/// Token-mode pairs are matcher-assigned (spec.md §9 Open Question (ii));
/// queue-mode pairs are anonymous sockets the namespace pairs itself.
enum CallSession {
    TokenMode { room_id: String, peer_id: String },
    QueueMode,
}

async fn handle_call_socket(mut socket: WebSocket, state: AppState, claim: SessionClaim) {
    let (self_id, session) = if claim.is_empty() {
        (Uuid::new_v4().to_string(), CallSession::QueueMode)
    } else {
        (
            claim.sender_id.clone(),
            CallSession::TokenMode { room_id: claim.room_id.clone(), peer_id: claim.receiver_id.clone() },
        )
    };

    let inbox_tx = state.call_room_broadcast(&self_id).await;
    let mut inbox_rx = inbox_tx.subscribe();

    match &session {
        CallSession::TokenMode { room_id, peer_id } => {
            ensure_token_room(&state, room_id, &self_id, peer_id).await;
            send_event(&mut socket, &CallEvent::UserJoined { room_id: room_id.clone() }).await;
        }
        CallSession::QueueMode => {
            if let Err(err) = state.store.call_queue.push(&self_id).await {
                warn!(error = %err, "failed to enqueue call socket");
            }
            send_event(&mut socket, &CallEvent::Lobby(LobbyStatus { waiting: true })).await;
            try_form_pair(&state).await;
        }
    }

    let mut bucket = TokenBucket::new(RATE_LIMIT_CAPACITY, RATE_LIMIT_PER_SEC, now_ms());

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if !bucket.try_acquire(now_ms()) {
                            send_error(&mut socket, error_codes::RATE_LIMITED, "too many actions").await;
                            continue;
                        }
                        match serde_json::from_str::<CallEvent>(&text) {
                            Ok(CallEvent::EndCall) => {
                                end_session(&state, &session, &self_id).await;
                                break;
                            }
                            Ok(event) => {
                                handle_call_event(&state, &session, &self_id, event).await;
                            }
                            Err(err) => {
                                send_error(&mut socket, error_codes::PROTOCOL_ERROR, &err.to_string()).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            Ok(event) = inbox_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    end_session(&state, &session, &self_id).await;
    drop(inbox_rx);
    state.retire_call_room_if_idle(&self_id).await;
}

/// Looks up the current peer to forward a signaling event to. Token-mode
/// peers are fixed at connect; queue-mode peers are resolved from the room
/// the matcher-less pairing step wrote.
async fn current_peer(state: &AppState, session: &CallSession, self_id: &str) -> Option<(String, String)> {
    match session {
        CallSession::TokenMode { room_id, peer_id } => Some((room_id.clone(), peer_id.clone())),
        CallSession::QueueMode => {
            let room_id = state.store.call_queue.room_id_for_socket(self_id).await.ok().flatten()?;
            let room = state.store.call_queue.load_room(&room_id).await.ok().flatten()?;
            let peer = room.other(self_id)?.to_owned();
            Some((room_id, peer))
        }
    }
}

async fn handle_call_event(state: &AppState, session: &CallSession, self_id: &str, event: CallEvent) {
    let Some((room_id, peer_id)) = current_peer(state, session, self_id).await else {
        // Events that arrive for a socket not yet in a room are ignored
        // (spec.md §4.F "Call namespace").
        return;
    };
    match event {
        CallEvent::Offer(_)
        | CallEvent::Answer(_)
        | CallEvent::AddIceCandidate(_)
        | CallEvent::SendOffer { .. }
        | CallEvent::Signal(_)
        | CallEvent::Heartbeat => {
            relay(state, &room_id, &peer_id, event).await;
        }
        CallEvent::EndCall => unreachable!("handled by the caller before dispatch"),
        CallEvent::FriendRequest(_)
        | CallEvent::Lobby(_)
        | CallEvent::CallEnded { .. }
        | CallEvent::UserJoined { .. }
        | CallEvent::UserLeft { .. }
        | CallEvent::Error(_) => {
            // Server-only or not-yet-supported on this namespace; dropped
            // silently rather than relayed.
        }
    }
}

async fn relay(state: &AppState, room_id: &str, target_socket_id: &str, event: CallEvent) {
    let envelope = CallSignalEnvelope {
        room_id: room_id.to_owned(),
        target_socket_id: target_socket_id.to_owned(),
        event,
    };
    let Ok(json) = serde_json::to_string(&envelope) else { return };
    if let Err(err) = state.store.pubsub.publish_call_signal(&json).await {
        warn!(error = %err, "failed to publish call signal");
    }
}

/// Pops two waiting sockets (if available) and assigns them a room (spec.md
/// §4.F, "If queue length >= 2, pop the two oldest"). Both notifications go
/// out over the same relay path used for in-call signaling, so it makes no
/// difference whether the two sockets are on this worker or another one.
async fn try_form_pair(state: &AppState) {
    let Ok(Some((a, b))) = state.store.call_queue.try_pop_pair().await else { return };
    let room_id = Uuid::new_v4().to_string();
    let room = CallRoomRecord {
        id: room_id.clone(),
        participant_a: a.clone(),
        participant_b: b.clone(),
        status: CallRoomStatus::Active,
        start_time_ms: now_ms(),
    };
    if let Err(err) = state.store.call_queue.save_room(&room).await {
        warn!(error = %err, "failed to save call room");
        return;
    }
    let _ = state.store.call_queue.map_socket_to_room(&a, &room_id).await;
    let _ = state.store.call_queue.map_socket_to_room(&b, &room_id).await;

    relay(state, &room_id, &a, CallEvent::SendOffer { room_id: room_id.clone() }).await;
    relay(state, &room_id, &b, CallEvent::Lobby(LobbyStatus { waiting: true })).await;
}

async fn ensure_token_room(state: &AppState, room_id: &str, self_id: &str, peer_id: &str) {
    if state.store.call_queue.load_room(room_id).await.ok().flatten().is_some() {
        return;
    }
    let room = CallRoomRecord {
        id: room_id.to_owned(),
        participant_a: self_id.to_owned(),
        participant_b: peer_id.to_owned(),
        status: CallRoomStatus::Active,
        start_time_ms: now_ms(),
    };
    if let Err(err) = state.store.call_queue.save_room(&room).await {
        warn!(error = %err, "failed to save call room");
    }
}

/// Handles `EndCall` and disconnect the same way (spec.md §4.F, "END_CALL
/// or disconnect"): persist call history, clear the room, and tell the
/// peer. Queue-mode re-enqueues a peer that is still around; token-mode
/// pairs are matcher-assigned and are simply over once one side leaves.
async fn end_session(state: &AppState, session: &CallSession, self_id: &str) {
    let room = match session {
        CallSession::TokenMode { room_id, .. } => state.store.call_queue.load_room(room_id).await.ok().flatten(),
        CallSession::QueueMode => {
            if let Ok(None) = state.store.call_queue.room_id_for_socket(self_id).await {
                let _ = state.store.call_queue.remove(self_id).await;
                return;
            }
            let Ok(Some(room_id)) = state.store.call_queue.room_id_for_socket(self_id).await else { return };
            state.store.call_queue.load_room(&room_id).await.ok().flatten()
        }
    };
    let Some(room) = room else { return };
    if room.status == CallRoomStatus::Ended {
        return;
    }

    let duration_sec = ((now_ms() - room.start_time_ms).max(0) / 1000) as i32;
    let started_at = ms_to_datetime(room.start_time_ms);
    let ended_at = ms_to_datetime(now_ms());
    if let Err(err) =
        calls_repo::record_call(&state.pool, &room.participant_a, &room.participant_b, duration_sec, started_at, ended_at).await
    {
        warn!(error = %err, "failed to record call history");
    }

    if let Err(err) = state.store.call_queue.end_room(&room).await {
        warn!(error = %err, "failed to clear ended call room");
    }

    let Some(peer_id) = room.other(self_id) else { return };
    relay(state, &room.id, peer_id, CallEvent::CallEnded { duration_sec }).await;

    if matches!(session, CallSession::QueueMode) {
        if let Err(err) = state.store.call_queue.push(peer_id).await {
            warn!(error = %err, "failed to re-enqueue remaining call participant");
        }
        relay(state, &room.id, peer_id, CallEvent::Lobby(LobbyStatus { waiting: true })).await;
        try_form_pair(state).await;
    }
}

fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

async fn send_event(socket: &mut WebSocket, event: &CallEvent) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(_) => Ok(()),
    }
}

async fn send_error(socket: &mut WebSocket, code: &str, message: &str) {
    let event = CallEvent::Error(ErrorMessage { code: code.to_owned(), message: message.to_owned() });
    let _ = send_event(socket, &event).await;
}

//! `/ws/chat` namespace (spec.md §4.F "Chat namespace").

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use driftline_protocol::{
    error_codes, ChatClientEvent, ChatEvent, ChatMessage, ErrorMessage, FriendRequestPayload,
    MessagePayload, MessageSentAck, NotificationPriority, RoomEvent, RoomEventType, RoomType,
    SessionClaim,
};
use driftline_match::TokenBucket;
use driftline_store::keys::GENERAL_ROOM_ID;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::notifications;
use crate::repo::{friendships, messages as messages_repo, users};
use crate::state::AppState;
use crate::ws::{now_ms, verify_handshake};

const RATE_LIMIT_CAPACITY: u32 = 10;
const RATE_LIMIT_PER_SEC: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub token: Option<String>,
}

pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChatQuery>,
) -> impl IntoResponse {
    let claim = verify_handshake(&state, &headers, query.token.as_deref());
    ws.on_upgrade(move |socket| handle_chat_socket(socket, state, claim))
}

struct ChatIdentity {
    room_id: String,
    sender_id: String,
    receiver_id: String,
    sender_username: Option<String>,
}

fn resolve_identity(claim: SessionClaim) -> ChatIdentity {
    if claim.is_empty() {
        ChatIdentity {
            room_id: GENERAL_ROOM_ID.to_owned(),
            sender_id: Uuid::new_v4().to_string(),
            receiver_id: "global".to_owned(),
            sender_username: None,
        }
    } else {
        ChatIdentity {
            room_id: claim.room_id,
            sender_id: claim.sender_id,
            receiver_id: claim.receiver_id,
            sender_username: claim.sender_username,
        }
    }
}

async fn handle_chat_socket(mut socket: WebSocket, state: AppState, claim: SessionClaim) {
    let identity = resolve_identity(claim);
    let ChatIdentity { room_id, sender_id, receiver_id, sender_username } = identity;

    if room_id != GENERAL_ROOM_ID {
        let existing = state.store.room_state.load(&room_id).await.unwrap_or(None);
        if existing.is_none() {
            if let Err(err) = state
                .store
                .room_state
                .create(&room_id, RoomType::Chat, &sender_id, &receiver_id, now_ms())
                .await
            {
                warn!(room_id = %room_id, error = %err, "failed to lazily initialize room state");
            }
        }
    }

    let room_tx = state.chat_room_broadcast(&room_id).await;
    let mut room_rx = room_tx.subscribe();

    send_room_history(&mut socket, &state, &room_id).await;

    publish_room_event(&state, &room_id, &sender_id, &sender_username, RoomEventType::Connected).await;

    let mut bucket = TokenBucket::new(RATE_LIMIT_CAPACITY, RATE_LIMIT_PER_SEC, now_ms());
    let mut left = false;

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if !bucket.try_acquire(now_ms()) {
                            send_error(&mut socket, error_codes::RATE_LIMITED, "too many actions").await;
                            continue;
                        }
                        match serde_json::from_str::<ChatClientEvent>(&text) {
                            Ok(event) => {
                                if matches!(event, ChatClientEvent::Leave) {
                                    left = true;
                                }
                                handle_chat_event(
                                    &mut socket,
                                    &state,
                                    &room_id,
                                    &sender_id,
                                    &receiver_id,
                                    &sender_username,
                                    event,
                                )
                                .await;
                                if left {
                                    break;
                                }
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
            Ok(event) = room_rx.recv() => {
                if let Ok(json) = serde_json::to_string(&event) {
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    let event_kind = if left { RoomEventType::Leave } else { RoomEventType::Disconnected };
    publish_room_event(&state, &room_id, &sender_id, &sender_username, event_kind).await;
    state.retire_chat_room_if_idle(&room_id).await;
}

#[allow(clippy::too_many_arguments)]
async fn handle_chat_event(
    socket: &mut WebSocket,
    state: &AppState,
    room_id: &str,
    sender_id: &str,
    receiver_id: &str,
    sender_username: &Option<String>,
    event: ChatClientEvent,
) {
    match event {
        ChatClientEvent::Message(payload) => {
            handle_message(socket, state, room_id, sender_id, receiver_id, sender_username, payload).await;
        }
        ChatClientEvent::UserTyping => {
            publish_room_event(state, room_id, sender_id, sender_username, RoomEventType::Typing).await;
        }
        ChatClientEvent::UserStoppedTyping => {
            publish_room_event(state, room_id, sender_id, sender_username, RoomEventType::StoppedTyping).await;
        }
        ChatClientEvent::UserConnected => {
            publish_room_event(state, room_id, sender_id, sender_username, RoomEventType::Connected).await;
        }
        ChatClientEvent::UserDisconnected => {
            publish_room_event(state, room_id, sender_id, sender_username, RoomEventType::Disconnected).await;
        }
        ChatClientEvent::FriendRequest(payload) => {
            handle_friend_request(state, sender_id, sender_username, payload).await;
        }
        ChatClientEvent::Leave => {
            // Handled by the caller -- it needs to break the connection loop.
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_message(
    socket: &mut WebSocket,
    state: &AppState,
    room_id: &str,
    sender_id: &str,
    receiver_id: &str,
    sender_username: &Option<String>,
    payload: MessagePayload,
) {
    let timestamp = now_ms();
    let id = Uuid::new_v4().to_string();

    let message = ChatMessage {
        id: id.clone(),
        room_id: room_id.to_owned(),
        sender_id: sender_id.to_owned(),
        receiver_id: receiver_id.to_owned(),
        sender_username: sender_username.clone(),
        receiver_username: None,
        content: payload.content,
        kind: payload.kind,
        timestamp,
    };

    let Ok(json) = serde_json::to_string(&message) else {
        send_error(socket, error_codes::INTERNAL_ERROR, "failed to encode message").await;
        return;
    };

    if room_id == GENERAL_ROOM_ID {
        if let Err(err) = state.store.chat_history.push_general_message(&json).await {
            warn!(error = %err, "failed to append general lobby message");
        }
    } else {
        match messages_repo::persist_message(
            &state.pool,
            room_id,
            sender_id,
            receiver_id,
            sender_username.as_deref(),
            None,
            &message.content,
            message.kind,
        )
        .await
        {
            Ok(_) => {
                if let Err(err) = state.store.chat_history.record_room_message_id(room_id, &id).await {
                    warn!(room_id = %room_id, error = %err, "failed to record room message id");
                }
            }
            Err(err) => {
                warn!(room_id = %room_id, error = %err, "failed to persist chat message");
                send_error(socket, error_codes::INTERNAL_ERROR, "failed to persist message").await;
                return;
            }
        }
    }

    if let Err(err) = state.store.pubsub.publish_chat_message(&json).await {
        warn!(error = %err, "failed to publish chat message");
    }

    let ack = ChatEvent::MessageSent(MessageSentAck { id, timestamp });
    if let Ok(ack_json) = serde_json::to_string(&ack) {
        let _ = socket.send(Message::Text(ack_json.into())).await;
    }
}

async fn handle_friend_request(
    state: &AppState,
    sender_id: &str,
    sender_username: &Option<String>,
    payload: FriendRequestPayload,
) {
    let Ok(Some(target)) = users::find_by_username(&state.pool, &payload.target_username).await else {
        return;
    };

    if let Ok(sender_uuid) = sender_id.parse::<uuid::Uuid>() {
        if let Err(err) = friendships::add_friendship(&state.pool, sender_uuid, target.id).await {
            warn!(error = %err, "failed to record friendship");
        }
    }

    let from = sender_username.clone().unwrap_or_else(|| sender_id.to_owned());
    if let Err(err) = notifications::create(
        state,
        &target.id.to_string(),
        "FRIEND_REQUEST",
        "New friend request",
        &format!("{from} wants to be friends"),
        NotificationPriority::Normal,
        json!({ "fromUserId": sender_id, "fromUsername": from }),
    )
    .await
    {
        warn!(error = %err, "failed to create friend request notification");
    }
}

async fn publish_room_event(
    state: &AppState,
    room_id: &str,
    client_id: &str,
    username: &Option<String>,
    kind: RoomEventType,
) {
    let event = RoomEvent {
        kind,
        room_id: room_id.to_owned(),
        client_id: client_id.to_owned(),
        username: username.clone(),
        timestamp: now_ms(),
    };
    let Ok(json) = serde_json::to_string(&event) else { return };
    if let Err(err) = state.store.pubsub.publish_room_event(&json).await {
        warn!(error = %err, "failed to publish room event");
    }
}

/// Replays recent messages on join (spec.md §4.F `RoomHistory`): the
/// general lobby keeps full payloads in its capped Redis list, while
/// per-room history is recorded as ids only and hydrated from Postgres.
async fn send_room_history(socket: &mut WebSocket, state: &AppState, room_id: &str) {
    let messages = if room_id == GENERAL_ROOM_ID {
        match state.store.chat_history.recent_general_messages().await {
            Ok(payloads) => payloads
                .into_iter()
                .rev()
                .filter_map(|payload| serde_json::from_str::<ChatMessage>(&payload).ok())
                .collect(),
            Err(err) => {
                warn!(error = %err, "failed to load general lobby history");
                return;
            }
        }
    } else {
        let ids = match state.store.chat_history.recent_room_message_ids(room_id).await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(room_id = %room_id, error = %err, "failed to load room history ids");
                return;
            }
        };
        let ids: Vec<Uuid> = ids.iter().rev().filter_map(|id| id.parse().ok()).collect();
        match messages_repo::list_by_ids(&state.pool, &ids).await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(room_id = %room_id, error = %err, "failed to hydrate room history");
                return;
            }
        }
    };

    if messages.is_empty() {
        return;
    }

    let event = ChatEvent::RoomHistory { messages };
    if let Ok(json) = serde_json::to_string(&event) {
        let _ = socket.send(Message::Text(json.into())).await;
    }
}

async fn send_error(socket: &mut WebSocket, code: &str, message: &str) {
    let event = ChatEvent::Error(ErrorMessage { code: code.to_owned(), message: message.to_owned() });
    if let Ok(json) = serde_json::to_string(&event) {
        let _ = socket.send(Message::Text(json.into())).await;
    }
}

//! Cross-worker fan-out (spec.md §4.F "each worker subscribes to
//! `chat:messages` and `chat:rooms`"; §9 "pub/sub + local emit
//! composition"). Each worker opens one dedicated subscriber per channel at
//! startup and re-dispatches every message into the local per-room/per-socket
//! broadcast registry held on `AppState`, the same two-hop shape the SSE
//! endpoint uses for a single user's channel.

use driftline_protocol::{CallSignalEnvelope, ChatEvent, RoomEvent};
use driftline_store::keys;
use futures_util::StreamExt;
use tracing::warn;

use crate::state::AppState;

/// Spawns the three long-lived subscriber tasks. Each retries its own
/// subscription independently on disconnect so one channel's Redis hiccup
/// never takes the others down with it.
pub fn spawn(state: AppState) {
    tokio::spawn(run_chat_messages(state.clone()));
    tokio::spawn(run_chat_rooms(state.clone()));
    tokio::spawn(run_call_signal(state));
}

async fn run_chat_messages(state: AppState) {
    let mut backoff = Backoff::default();
    loop {
        match driftline_store::pubsub::subscribe(&state.config.redis_url, &[keys::CHAT_MESSAGES_CHANNEL]).await {
            Ok(mut pubsub) => {
                backoff.reset();
                let mut messages = pubsub.on_message();
                while let Some(msg) = messages.next().await {
                    let Ok(payload) = msg.get_payload::<String>() else { continue };
                    let Ok(message) = serde_json::from_str::<driftline_protocol::ChatMessage>(&payload) else { continue };
                    let tx = state.chat_room_broadcast(&message.room_id).await;
                    let _ = tx.send(ChatEvent::Message(message));
                }
            }
            Err(err) => warn!(error = %err, "chat:messages subscription failed"),
        }
        backoff.wait().await;
    }
}

async fn run_chat_rooms(state: AppState) {
    let mut backoff = Backoff::default();
    loop {
        match driftline_store::pubsub::subscribe(&state.config.redis_url, &[keys::CHAT_ROOMS_CHANNEL]).await {
            Ok(mut pubsub) => {
                backoff.reset();
                let mut messages = pubsub.on_message();
                while let Some(msg) = messages.next().await {
                    let Ok(payload) = msg.get_payload::<String>() else { continue };
                    let Ok(event) = serde_json::from_str::<RoomEvent>(&payload) else { continue };
                    let chat_event = match event.kind {
                        driftline_protocol::RoomEventType::Typing => Some(ChatEvent::UserTyping),
                        driftline_protocol::RoomEventType::StoppedTyping => Some(ChatEvent::UserStoppedTyping),
                        driftline_protocol::RoomEventType::Connected => Some(ChatEvent::UserConnected),
                        driftline_protocol::RoomEventType::Disconnected => Some(ChatEvent::UserDisconnected),
                        driftline_protocol::RoomEventType::Join => Some(ChatEvent::UserJoined { user_id: event.client_id.clone() }),
                        driftline_protocol::RoomEventType::Leave => Some(ChatEvent::UserLeft { user_id: event.client_id.clone() }),
                    };
                    if let Some(chat_event) = chat_event {
                        let tx = state.chat_room_broadcast(&event.room_id).await;
                        let _ = tx.send(chat_event);
                    }
                }
            }
            Err(err) => warn!(error = %err, "chat:rooms subscription failed"),
        }
        backoff.wait().await;
    }
}

async fn run_call_signal(state: AppState) {
    let mut backoff = Backoff::default();
    loop {
        match driftline_store::pubsub::subscribe(&state.config.redis_url, &[keys::CALL_SIGNAL_CHANNEL]).await {
            Ok(mut pubsub) => {
                backoff.reset();
                let mut messages = pubsub.on_message();
                while let Some(msg) = messages.next().await {
                    let Ok(payload) = msg.get_payload::<String>() else { continue };
                    let Ok(envelope) = serde_json::from_str::<CallSignalEnvelope>(&payload) else { continue };
                    let tx = state.call_room_broadcast(&envelope.target_socket_id).await;
                    let _ = tx.send(envelope.event);
                }
            }
            Err(err) => warn!(error = %err, "call:signal subscription failed"),
        }
        backoff.wait().await;
    }
}

/// Capped exponential backoff (spec.md §7, "auto-resubscribe with capped
/// exponential backoff, <=3 retries per channel per cycle, doubling delay
/// from 1s"). After the third retry in a cycle the delay holds at its
/// ceiling rather than growing further, until `reset` starts a fresh cycle.
struct Backoff {
    attempt: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { attempt: 0 }
    }
}

impl Backoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    async fn wait(&mut self) {
        let capped_attempt = self.attempt.min(3);
        let delay_secs = 1u64 << capped_attempt.saturating_sub(1).min(2);
        self.attempt += 1;
        tokio::time::sleep(std::time::Duration::from_secs(delay_secs)).await;
    }
}

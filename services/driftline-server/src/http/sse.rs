//! `GET /sse/events` (spec.md §4.H, §6): per-user notification stream.
//! Presence is tracked for the life of the connection; the first frame is
//! a `ping` carrying the total online-user count, followed by any
//! previously-unsent notifications and then live pushes relayed through
//! this user's Redis pub/sub channel (spec.md §9, "pub/sub + local emit
//! composition" -- a notification published by a sibling worker must
//! still reach a socket attached here).

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use driftline_protocol::SsePingFrame;
use driftline_store::PresenceStore;
use futures_util::stream::{Stream, StreamExt};
use serde::Deserialize;
use tracing::warn;

use crate::auth::authorize_user;
use crate::http::response::HttpResponse;
use crate::notifications;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SseParams {
    pub user_id: String,
}

/// Releases this connection's presence slot when dropped, whichever way
/// the stream stops being polled -- normal completion, client disconnect,
/// or the whole response future being dropped by axum. `disconnect` is
/// async, so the actual Redis round trip runs on a detached task; the
/// drop itself only has to schedule it (spec.md §4.H, "last connection
/// removes it").
struct PresenceGuard {
    presence: PresenceStore,
    user_id: String,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        let presence = self.presence.clone();
        let user_id = self.user_id.clone();
        tokio::spawn(async move {
            if let Err(err) = presence.disconnect(&user_id).await {
                warn!(user_id = %user_id, error = %err, "failed to release SSE presence slot");
            }
        });
    }
}

pub async fn notifications_sse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SseParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HttpResponse> {
    authorize_user(&headers, &state, &params.user_id)?;
    let user_id = params.user_id;

    if let Err(err) = state.store.presence.connect(&user_id).await {
        return Err(crate::http::response::internal_error(err));
    }
    if let Err(err) = notifications::flush_unsent(&state, &user_id).await {
        warn!(user_id = %user_id, error = %err, "failed to flush unsent notifications on connect");
    }

    let total_users = state
        .store
        .presence
        .online_users()
        .await
        .map(|users| users.len())
        .unwrap_or(0);
    let ping = SsePingFrame {
        total_users: total_users as u64,
        user_id: user_id.clone(),
    };
    let ping_json = serde_json::to_string(&ping).unwrap_or_default();

    let guard = PresenceGuard { presence: state.store.presence.clone(), user_id: user_id.clone() };
    let redis_url = state.config.redis_url.clone();

    let out = async_stream::stream! {
        // Moved into the generator so it is held (and dropped) for exactly
        // the stream's lifetime, including early cancellation.
        let _guard = guard;

        yield Ok(Event::default().event("ping").data(ping_json));

        let pubsub = match driftline_store::pubsub::subscribe_user(&redis_url, &user_id).await {
            Ok(pubsub) => pubsub,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "failed to subscribe to SSE channel");
                return;
            }
        };
        let mut messages = pubsub.into_on_message();
        while let Some(msg) = messages.next().await {
            let Ok(payload) = msg.get_payload::<String>() else {
                continue;
            };
            yield Ok(Event::default().event("notification").data(payload));
        }
    };

    Ok(Sse::new(out).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}

//! Notification Service (spec.md §4.H): create → presence-check → publish
//! or persist-as-unsent; flush unsent rows on SSE (re)connection.

use driftline_protocol::{Notification, NotificationPriority};
use serde_json::Value;
use tracing::warn;

use crate::repo::notifications as notifications_repo;
use crate::state::AppState;

/// Creates a notification, publishing it live if the recipient holds an
/// open SSE stream, otherwise persisting it `isSent = false` for the next
/// flush (spec.md §4.H, "Create path").
pub async fn create(
    state: &AppState,
    user_id: &str,
    notification_type: &str,
    title: &str,
    message: &str,
    priority: NotificationPriority,
    data: Value,
) -> Result<Notification, sqlx::Error> {
    let present = state.store.presence.is_online(user_id).await.unwrap_or(false);

    let row = notifications_repo::insert(
        &state.pool,
        user_id,
        notification_type,
        title,
        message,
        priority,
        &data,
        present,
    )
    .await?;

    if present {
        publish(state, &row).await;
    }

    Ok(row)
}

async fn publish(state: &AppState, notification: &Notification) {
    let Ok(payload) = serde_json::to_string(notification) else {
        return;
    };
    if let Err(err) = state.store.pubsub.publish_to_user(&notification.user_id, &payload).await {
        warn!(user_id = %notification.user_id, error = %err, "failed to publish notification");
    }
}

/// Loads every unsent row for `user_id`, publishes each to their SSE
/// channel, and deletes the ones that published successfully (spec.md
/// §4.H, "Flush path"). Rows that fail to publish are left for the next
/// flush.
pub async fn flush_unsent(state: &AppState, user_id: &str) -> Result<(), sqlx::Error> {
    let unsent = notifications_repo::list_unsent(&state.pool, user_id).await?;
    for notification in unsent {
        let Ok(payload) = serde_json::to_string(&notification) else {
            continue;
        };
        match state.store.pubsub.publish_to_user(user_id, &payload).await {
            Ok(()) => {
                if let Err(err) = notifications_repo::delete(&state.pool, &notification.id).await {
                    warn!(id = %notification.id, error = %err, "failed to delete flushed notification");
                }
            }
            Err(err) => {
                warn!(id = %notification.id, error = %err, "failed to flush notification, leaving unsent");
            }
        }
    }
    Ok(())
}

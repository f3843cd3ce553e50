//! Durable Notification rows (spec.md §4.H Notification Service).

use driftline_protocol::{Notification, NotificationPriority};
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

fn priority_str(p: NotificationPriority) -> &'static str {
    match p {
        NotificationPriority::Low => "low",
        NotificationPriority::Normal => "normal",
        NotificationPriority::High => "high",
    }
}

fn parse_priority(s: &str) -> NotificationPriority {
    match s {
        "low" => NotificationPriority::Low,
        "high" => NotificationPriority::High,
        _ => NotificationPriority::Normal,
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    pool: &PgPool,
    user_id: &str,
    notification_type: &str,
    title: &str,
    message: &str,
    priority: NotificationPriority,
    data: &Value,
    is_sent: bool,
) -> Result<Notification, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO notifications (user_id, notification_type, title, message, priority, data, is_sent)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING id, created_at"#,
    )
    .bind(user_id)
    .bind(notification_type)
    .bind(title)
    .bind(message)
    .bind(priority_str(priority))
    .bind(data)
    .bind(is_sent)
    .fetch_one(pool)
    .await?;

    Ok(Notification {
        id: row.get::<Uuid, _>("id").to_string(),
        user_id: user_id.to_owned(),
        kind: notification_type.to_owned(),
        title: title.to_owned(),
        message: message.to_owned(),
        priority,
        data: data.clone(),
        is_sent,
        created_at: row.get::<chrono::DateTime<chrono::Utc>, _>("created_at").timestamp_millis(),
    })
}

/// All `isSent=false` rows for `user_id` (spec.md §4.H "Flush path").
pub async fn list_unsent(pool: &PgPool, user_id: &str) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, user_id, notification_type, title, message, priority, data, is_sent, created_at
           FROM notifications WHERE user_id = $1 AND is_sent = false
           ORDER BY created_at ASC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Notification {
            id: row.get::<Uuid, _>("id").to_string(),
            user_id: row.get("user_id"),
            kind: row.get("notification_type"),
            title: row.get("title"),
            message: row.get("message"),
            priority: parse_priority(row.get("priority")),
            data: row.get("data"),
            is_sent: row.get("is_sent"),
            created_at: row
                .get::<chrono::DateTime<chrono::Utc>, _>("created_at")
                .timestamp_millis(),
        })
        .collect())
}

/// Marks a delivered row as sent and removed from the unsent queue (spec.md
/// §4.H: "deletes successfully-delivered rows").
pub async fn delete(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    let Ok(uuid) = id.parse::<Uuid>() else {
        return Ok(());
    };
    sqlx::query("DELETE FROM notifications WHERE id = $1")
        .bind(uuid)
        .execute(pool)
        .await?;
    Ok(())
}

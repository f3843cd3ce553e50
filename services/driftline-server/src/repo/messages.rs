//! Non-general chat messages (spec.md §3 "Message"; §4.F `message` event).
//! The `general` lobby never reaches this table -- it is retained only as
//! a bounded Redis list (spec.md §9 "General lobby").

use driftline_protocol::{ChatMessage, MessageType};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct MessageRow {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

fn message_type_str(t: MessageType) -> &'static str {
    match t {
        MessageType::Text => "text",
        MessageType::Image => "image",
        MessageType::Gif => "gif",
        MessageType::Audio => "audio",
        MessageType::Video => "video",
        MessageType::File => "file",
    }
}

fn parse_message_type(s: &str) -> MessageType {
    match s {
        "image" => MessageType::Image,
        "gif" => MessageType::Gif,
        "audio" => MessageType::Audio,
        "video" => MessageType::Video,
        "file" => MessageType::File,
        _ => MessageType::Text,
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn persist_message(
    pool: &PgPool,
    room_id: &str,
    sender_id: &str,
    receiver_id: &str,
    sender_username: Option<&str>,
    receiver_username: Option<&str>,
    content: &str,
    message_type: MessageType,
) -> Result<MessageRow, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO messages
               (room_id, sender_id, receiver_id, sender_username, receiver_username, content, message_type)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING id, created_at"#,
    )
    .bind(room_id)
    .bind(sender_id)
    .bind(receiver_id)
    .bind(sender_username)
    .bind(receiver_username)
    .bind(content)
    .bind(message_type_str(message_type))
    .fetch_one(pool)
    .await?;

    Ok(MessageRow {
        id: row.get("id"),
        created_at: row.get("created_at"),
    })
}

/// Hydrates full rows for a set of message ids, oldest first (spec.md §4.F
/// `RoomHistory`). Ids come from the bounded Redis list recorded alongside
/// each persisted message; a missing row (should not happen, but the table
/// has no FK back from the Redis list) is silently skipped.
pub async fn list_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<ChatMessage>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        r#"SELECT id, room_id, sender_id, receiver_id, sender_username, receiver_username,
                  content, message_type, created_at
           FROM messages
           WHERE id = ANY($1)
           ORDER BY created_at ASC"#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ChatMessage {
            id: row.get::<Uuid, _>("id").to_string(),
            room_id: row.get("room_id"),
            sender_id: row.get("sender_id"),
            receiver_id: row.get("receiver_id"),
            sender_username: row.get("sender_username"),
            receiver_username: row.get("receiver_username"),
            content: row.get("content"),
            kind: parse_message_type(row.get::<String, _>("message_type").as_str()),
            timestamp: row
                .get::<chrono::DateTime<chrono::Utc>, _>("created_at")
                .timestamp_millis(),
        })
        .collect())
}

//! Room Store (spec.md §4.B): durable create/lookup of a pairing record,
//! with a thin read-through Redis cache (TTL 24h, invalidated on any
//! mutation -- there are none after creation, so invalidation never
//! actually fires today, but `driftline_store::RoomCacheStore` exposes it
//! for completeness).

use driftline_protocol::RoomType;
use driftline_store::RoomCacheStore;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRow {
    pub room_id: String,
    pub room_type: RoomType,
    pub user1_id: String,
    pub user2_id: String,
}

fn room_type_str(room_type: RoomType) -> &'static str {
    match room_type {
        RoomType::Chat => "chat",
        RoomType::Call => "call",
        RoomType::VideoCall => "video_call",
    }
}

fn parse_room_type(s: &str) -> RoomType {
    match s {
        "call" => RoomType::Call,
        "video_call" => RoomType::VideoCall,
        _ => RoomType::Chat,
    }
}

pub async fn create_room(
    pool: &PgPool,
    cache: &RoomCacheStore,
    user1_id: &str,
    user2_id: &str,
    user1_anonymous_id: Option<&str>,
    user2_anonymous_id: Option<&str>,
    room_type: RoomType,
) -> Result<RoomRow, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO rooms (room_type, user1_id, user2_id, user1_anonymous_id, user2_anonymous_id)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING room_id"#,
    )
    .bind(room_type_str(room_type))
    .bind(user1_id)
    .bind(user2_id)
    .bind(user1_anonymous_id)
    .bind(user2_anonymous_id)
    .fetch_one(pool)
    .await?;

    let room = RoomRow {
        room_id: row.get::<uuid::Uuid, _>("room_id").to_string(),
        room_type,
        user1_id: user1_id.to_owned(),
        user2_id: user2_id.to_owned(),
    };
    let _ = cache.set(&room.room_id, &room).await;
    Ok(room)
}

pub async fn get_room(
    pool: &PgPool,
    cache: &RoomCacheStore,
    room_id: &str,
) -> Result<Option<RoomRow>, sqlx::Error> {
    if let Ok(Some(cached)) = cache.get::<RoomRow>(room_id).await {
        return Ok(Some(cached));
    }
    let Ok(uuid) = room_id.parse::<uuid::Uuid>() else {
        return Ok(None);
    };
    let row = sqlx::query("SELECT room_id, room_type, user1_id, user2_id FROM rooms WHERE room_id = $1")
        .bind(uuid)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else { return Ok(None) };
    let room = RoomRow {
        room_id: row.get::<uuid::Uuid, _>("room_id").to_string(),
        room_type: parse_room_type(row.get("room_type")),
        user1_id: row.get("user1_id"),
        user2_id: row.get("user2_id"),
    };
    let _ = cache.set(&room.room_id, &room).await;
    Ok(Some(room))
}

/// Room between `a` and `b` (either slot ordering) of `room_type`, if one
/// exists (spec.md §4.B, "`getRoomByUsers(a, b)` (both orderings)").
pub async fn get_room_by_users(
    pool: &PgPool,
    a: &str,
    b: &str,
    room_type: RoomType,
) -> Result<Option<RoomRow>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT room_id, room_type, user1_id, user2_id FROM rooms
           WHERE room_type = $1
             AND ((user1_id = $2 AND user2_id = $3) OR (user1_id = $3 AND user2_id = $2))
           ORDER BY created_at DESC LIMIT 1"#,
    )
    .bind(room_type_str(room_type))
    .bind(a)
    .bind(b)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|row| RoomRow {
        room_id: row.get::<uuid::Uuid, _>("room_id").to_string(),
        room_type,
        user1_id: row.get("user1_id"),
        user2_id: row.get("user2_id"),
    }))
}

/// Most recent room of `room_type` involving `user_id`, in either slot.
pub async fn get_room_by_user(
    pool: &PgPool,
    user_id: &str,
    room_type: RoomType,
) -> Result<Option<RoomRow>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT room_id, room_type, user1_id, user2_id FROM rooms
           WHERE room_type = $1 AND (user1_id = $2 OR user2_id = $2)
           ORDER BY created_at DESC LIMIT 1"#,
    )
    .bind(room_type_str(room_type))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|row| RoomRow {
        room_id: row.get::<uuid::Uuid, _>("room_id").to_string(),
        room_type,
        user1_id: row.get("user1_id"),
        user2_id: row.get("user2_id"),
    }))
}

//! Minimal user registry backing Room/Friendship foreign keys and the
//! subscription-expiry scheduler (spec.md §4.I).

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub is_pro: bool,
    pub pro_end: Option<DateTime<Utc>>,
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<UserRow>, sqlx::Error> {
    let row = sqlx::query("SELECT id, username, is_pro, pro_end FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| UserRow {
        id: row.get("id"),
        username: row.get("username"),
        is_pro: row.get("is_pro"),
        pro_end: row.get("pro_end"),
    }))
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    let row = sqlx::query("SELECT id, username, is_pro, pro_end FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| UserRow {
        id: row.get("id"),
        username: row.get("username"),
        is_pro: row.get("is_pro"),
        pro_end: row.get("pro_end"),
    }))
}

/// Idempotent: returns the existing row if `username` is already taken.
pub async fn find_or_create(pool: &PgPool, username: &str) -> Result<UserRow, sqlx::Error> {
    if let Some(existing) = find_by_username(pool, username).await? {
        return Ok(existing);
    }
    let row = sqlx::query(
        r#"INSERT INTO users (username) VALUES ($1)
           ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
           RETURNING id, username, is_pro, pro_end"#,
    )
    .bind(username)
    .fetch_one(pool)
    .await?;
    Ok(UserRow {
        id: row.get("id"),
        username: row.get("username"),
        is_pro: row.get("is_pro"),
        pro_end: row.get("pro_end"),
    })
}

pub async fn set_pro(pool: &PgPool, id: Uuid, pro_end: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET is_pro = true, pro_end = $2 WHERE id = $1")
        .bind(id)
        .bind(pro_end)
        .execute(pool)
        .await?;
    Ok(())
}

/// Users whose `proEnd` has passed; the subscription-expiry scheduler clears
/// `isPro` for each (spec.md §4.I).
pub async fn find_expired_pro(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows = sqlx::query("SELECT id FROM users WHERE is_pro = true AND pro_end IS NOT NULL AND pro_end <= $1")
        .bind(now)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|row| row.get("id")).collect())
}

pub async fn clear_pro(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET is_pro = false, pro_end = NULL WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Credits `points` to `user_id` (spec.md §4.C heartbeat side effect,
/// "award points to that user via the Points collaborator"). A no-op for
/// anonymous (non-UUID) ids, which have no row to credit, and for
/// `points == 0`.
pub async fn add_points(pool: &PgPool, user_id: &str, points: u32) -> Result<(), sqlx::Error> {
    if points == 0 {
        return Ok(());
    }
    let Ok(id) = user_id.parse::<Uuid>() else {
        return Ok(());
    };
    sqlx::query("UPDATE users SET points = points + $2 WHERE id = $1")
        .bind(id)
        .bind(i64::from(points))
        .execute(pool)
        .await?;
    Ok(())
}

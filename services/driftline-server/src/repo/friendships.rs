//! Friendship lookup (SPEC_FULL.md §6; spec.md §9 Open Question (i) --
//! treated as a plain boolean lookup, nothing more).

use sqlx::{PgPool, Row};

pub async fn is_friend(pool: &PgPool, user_id: &str, peer_id: &str) -> Result<bool, sqlx::Error> {
    let (Ok(user_id), Ok(peer_id)) = (user_id.parse::<uuid::Uuid>(), peer_id.parse::<uuid::Uuid>())
    else {
        // Anonymous (non-UUID) ids can never have a friendship row.
        return Ok(false);
    };
    let row = sqlx::query(
        r#"SELECT EXISTS(
               SELECT 1 FROM friendships WHERE user_id = $1 AND friend_id = $2
           ) AS exists"#,
    )
    .bind(user_id)
    .bind(peer_id)
    .fetch_one(pool)
    .await?;
    Ok(row.get::<bool, _>("exists"))
}

pub async fn add_friendship(pool: &PgPool, user_id: uuid::Uuid, friend_id: uuid::Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO friendships (user_id, friend_id) VALUES ($1, $2), ($2, $1)
           ON CONFLICT DO NOTHING"#,
    )
    .bind(user_id)
    .bind(friend_id)
    .execute(pool)
    .await?;
    Ok(())
}

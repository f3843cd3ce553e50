//! Call history (spec.md §4.F "END_CALL or disconnect"; SPEC_FULL.md §6).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub async fn record_call(
    pool: &PgPool,
    initiator_id: &str,
    receiver_id: &str,
    duration_sec: i32,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO calls (initiator_id, receiver_id, duration_sec, started_at, ended_at)
           VALUES ($1, $2, $3, $4, $5)"#,
    )
    .bind(initiator_id)
    .bind(receiver_id)
    .bind(duration_sec)
    .bind(started_at)
    .bind(ended_at)
    .execute(pool)
    .await?;
    Ok(())
}

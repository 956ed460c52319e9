use sqlx::PgPool;

use crate::trails::models::{TrailData, ValidTrail};

/// Uploads retained per user.
pub const MAX_TRAILS_PER_USER: i64 = 3;

pub async fn insert(pool: &PgPool, user_id: &str, trail: &ValidTrail) -> Result<TrailData, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, TrailData>(
        r#"
        INSERT INTO trail_data (user_id, coordinates, distance_meters, elevation_gain_meters, trail_conditions)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&trail.coordinates)
    .bind(trail.distance_meters)
    .bind(trail.elevation_gain_meters)
    .bind(&trail.trail_conditions)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        DELETE FROM trail_data
        WHERE user_id = $1
          AND id NOT IN (
            SELECT id FROM trail_data
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
          )
        "#,
    )
    .bind(user_id)
    .bind(MAX_TRAILS_PER_USER)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<TrailData>, sqlx::Error> {
    sqlx::query_as::<_, TrailData>(
        "SELECT * FROM trail_data WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn latest_for_user(pool: &PgPool, user_id: &str) -> Result<Option<TrailData>, sqlx::Error> {
    sqlx::query_as::<_, TrailData>(
        "SELECT * FROM trail_data WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_for_user(
    pool: &PgPool,
    user_id: &str,
    id: i32,
) -> Result<Option<TrailData>, sqlx::Error> {
    sqlx::query_as::<_, TrailData>("SELECT * FROM trail_data WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn update_for_user(
    pool: &PgPool,
    user_id: &str,
    id: i32,
    trail: &ValidTrail,
) -> Result<Option<TrailData>, sqlx::Error> {
    sqlx::query_as::<_, TrailData>(
        r#"
        UPDATE trail_data
        SET coordinates = $3, distance_meters = $4, elevation_gain_meters = $5, trail_conditions = $6
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&trail.coordinates)
    .bind(trail.distance_meters)
    .bind(trail.elevation_gain_meters)
    .bind(&trail.trail_conditions)
    .fetch_optional(pool)
    .await
}

pub async fn delete_for_user(pool: &PgPool, user_id: &str, id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM trail_data WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

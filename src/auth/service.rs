use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::task;
use uuid::Uuid;

use crate::auth::models::User;
use crate::error::{AppError, AppResult};

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: Option<&'a str>,
    pub hashed_password: String,
    pub is_verified: bool,
    pub apple_user_id: Option<&'a str>,
}

pub fn is_valid_email(email: &str) -> bool {
    if email.len() <= 5 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some(at_pos) = email.find('@') else {
        return false;
    };
    if at_pos == 0 || at_pos == email.len() - 1 {
        return false;
    }
    let domain_part = &email[at_pos + 1..];
    !domain_part.contains('@') && domain_part.contains('.')
}

pub const fn is_valid_password(password: &str) -> bool {
    password.len() >= 8
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Fallback username for accounts created without one.
pub fn generated_username(user_id: &str, created_at: DateTime<Utc>) -> String {
    let prefix: String = user_id.chars().take(8).collect();
    format!("user_{}_{}", prefix, created_at.timestamp())
}

pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    task::spawn_blocking(move || bcrypt::hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
}

pub async fn verify_password(password: &str, hashed: &str) -> AppResult<bool> {
    // Accounts created through Google/Apple have no password.
    if hashed.is_empty() {
        return Ok(false);
    }
    let password = password.to_string();
    let hashed = hashed.to_string();
    let is_valid = task::spawn_blocking(move || bcrypt::verify(&password, &hashed))
        .await
        .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))?
        .unwrap_or(false);
    Ok(is_valid)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> AppResult<Option<User>> {
    Ok(
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn find_by_apple_id(pool: &PgPool, apple_user_id: &str) -> AppResult<Option<User>> {
    Ok(
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE apple_user_id = $1")
            .bind(apple_user_id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn username_taken(pool: &PgPool, username: &str) -> AppResult<bool> {
    let row: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn create_user(pool: &PgPool, new_user: NewUser<'_>) -> AppResult<User> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let username = match new_user.username.map(str::trim).filter(|u| !u.is_empty()) {
        Some(name) => name.to_string(),
        None => generated_username(&id, now),
    };

    let result = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, username, hashed_password, is_verified, apple_user_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(normalize_email(new_user.email))
    .bind(&username)
    .bind(&new_user.hashed_password)
    .bind(new_user.is_verified)
    .bind(new_user.apple_user_id)
    .bind(now)
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            if db_err.constraint().is_some_and(|c| c.contains("username")) {
                Err(AppError::Conflict("Username already taken".into()))
            } else {
                Err(AppError::Conflict("Email already exists".into()))
            }
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn mark_verified(pool: &PgPool, email: &str) -> AppResult<Option<User>> {
    Ok(sqlx::query_as::<_, User>(
        "UPDATE users SET is_verified = TRUE, updated_at = NOW() WHERE email = $1 RETURNING *",
    )
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await?)
}

pub async fn link_apple_id(pool: &PgPool, user_id: &str, apple_user_id: &str) -> AppResult<User> {
    Ok(sqlx::query_as::<_, User>(
        "UPDATE users SET apple_user_id = $2, is_verified = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(apple_user_id)
    .fetch_one(pool)
    .await?)
}

/// Trail rows go with the user through `ON DELETE CASCADE`.
pub async fn delete_user(pool: &PgPool, user_id: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

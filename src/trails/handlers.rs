use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::extract::{JsonBody, PathParam};
use crate::state::AppState;
use crate::trails::models::{TrailData, TrailDataInput};
use crate::trails::repository;

fn not_found() -> AppError {
    AppError::not_found("No trail data found")
}

pub async fn create_trail(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(input): JsonBody<TrailDataInput>,
) -> AppResult<impl IntoResponse> {
    let trail = input.validate().map_err(AppError::BadRequest)?;
    let row = repository::insert(&state.pool, &user.id, &trail).await?;
    info!(user_id = %user.id, trail_id = row.id, "Trail data uploaded");
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_trails(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Vec<TrailData>>> {
    Ok(Json(repository::list_for_user(&state.pool, &user.id).await?))
}

pub async fn latest_trail(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<TrailData>> {
    repository::latest_for_user(&state.pool, &user.id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn get_trail(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    PathParam(id): PathParam<i32>,
) -> AppResult<Json<TrailData>> {
    repository::get_for_user(&state.pool, &user.id, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn update_trail(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    PathParam(id): PathParam<i32>,
    JsonBody(input): JsonBody<TrailDataInput>,
) -> AppResult<Json<TrailData>> {
    let trail = input.validate().map_err(AppError::BadRequest)?;
    repository::update_for_user(&state.pool, &user.id, id, &trail)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn delete_trail(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    PathParam(id): PathParam<i32>,
) -> AppResult<impl IntoResponse> {
    if !repository::delete_for_user(&state.pool, &user.id, id).await? {
        return Err(not_found());
    }
    info!(user_id = %user.id, trail_id = id, "Trail data deleted");
    Ok(Json(json!({ "message": "Trail data deleted" })))
}

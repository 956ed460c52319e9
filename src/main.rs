use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shuttle_runtime::SecretStore;
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;

mod aiengine;
mod auth;
mod config;
mod database;
mod error;
mod extract;
mod llm;
mod orchestrator;
mod registries;
mod state;
mod tools;
mod trails;

use config::Config;
use state::AppState;

const STATIC_DIR: &str = "static";

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::handlers::register))
        .route("/login", post(auth::handlers::login))
        .route("/logout", post(auth::handlers::logout))
        .route("/me", get(auth::handlers::me))
        .route("/delete-account", delete(auth::handlers::delete_account))
        .route("/google", post(auth::handlers::google_auth))
        .route("/apple", post(auth::handlers::apple_auth))
        .route("/send-code", post(auth::handlers::send_code))
        .route("/verify-code", post(auth::handlers::verify_code))
        .route("/verify", post(auth::handlers::verify_and_login));

    let trail_routes = Router::new()
        .route(
            "/",
            post(trails::handlers::create_trail).get(trails::handlers::list_trails),
        )
        .route("/latest", get(trails::handlers::latest_trail))
        .route(
            "/{id}",
            get(trails::handlers::get_trail)
                .put(trails::handlers::update_trail)
                .delete(trails::handlers::delete_trail),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_routes)
        .nest("/trail-data", trail_routes)
        .route("/ai/orchestrator", post(orchestrator::orchestrate))
        .route("/gear/recommend", post(aiengine::recommend_gear))
        .route(
            "/aiengine/gear-and-hike-suggest",
            get(aiengine::gear_and_hike_suggest),
        )
        .route_service(
            "/terms-of-service",
            ServeFile::new(format!("{STATIC_DIR}/terms-of-service.html")),
        )
        .route_service(
            "/privacy-policy",
            ServeFile::new(format!("{STATIC_DIR}/privacy-policy.html")),
        )
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[shuttle_runtime::main]
async fn main(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secrets: SecretStore,
) -> shuttle_axum::ShuttleAxum {
    database::init_db(&pool)
        .await
        .map_err(|e| shuttle_runtime::Error::Database(e.to_string()))?;

    let config = Config::from_secrets(&secrets);
    info!(
        llm = config.openai_api_key.is_some(),
        weather = config.openweather_api_key.is_some(),
        places = config.google_places_api_key.is_some(),
        "Starting trailmate"
    );

    Ok(build_router(AppState::new(pool, config)).into())
}

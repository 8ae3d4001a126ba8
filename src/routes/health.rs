use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::{self, DbHealth};
use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    database: DbHealth,
}

/// `GET /health`: Liveness only, never touches the database.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /api/v1/health`: Includes a database round-trip.
async fn detailed_health(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let database = db::check_health(&state.db).await;
    let status = if database.connected {
        "healthy"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}

pub fn root_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub fn api_router() -> Router<AppState> {
    Router::new().route("/health", get(detailed_health))
}

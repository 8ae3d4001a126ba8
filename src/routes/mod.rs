mod auth;
mod card_bases;
mod cards;
mod games;
mod health;
mod offers;
mod publications;
mod statistics;
mod users;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router.
///
/// Structure:
/// - `GET /health`: Lightweight liveness check
/// - `/api/v1/...`: Every resource group plus a detailed health check
pub fn router() -> Router<AppState> {
    let api_v1 = Router::new()
        .merge(health::api_router())
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/games", games::router())
        .nest("/card-bases", card_bases::router())
        .nest("/cards", cards::router())
        .nest("/publications", publications::router())
        .nest("/offers", offers::router())
        .nest("/statistics", statistics::router());

    Router::new()
        .merge(health::root_router())
        .nest("/api/v1", api_v1)
}

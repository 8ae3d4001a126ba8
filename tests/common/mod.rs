#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use card_trade_api::config::{Config, Environment};
use card_trade_api::entities::user;
use card_trade_api::state::AppState;

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        server_host: std::net::IpAddr::from([127, 0, 0, 1]),
        server_port: 0,
        environment: Environment::Development,
        log_level: "warn".to_string(),
        jwt_secret: "test-secret-key-for-testing-only-32chars".to_string(),
        jwt_access_expiration_secs: 900,
        jwt_refresh_expiration_secs: 604_800,
        frontend_url: "http://localhost:3001".to_string(),
        upload_dir: std::env::temp_dir()
            .join(format!("card-trade-uploads-{}", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned(),
    }
}

/// Full router over a fresh, migrated in-memory database.
pub async fn test_app() -> (Router, AppState) {
    let config = test_config();
    let db = card_trade_api::db::connect(&config.database_url)
        .await
        .unwrap_or_default();
    Migrator::up(&db, None).await.unwrap_or_default();

    let state = AppState { db, config };
    let app = card_trade_api::routes::router().with_state(state.clone());
    (app, state)
}

// ──────────────────────────────────────────────────────────────────────────────
// Request helpers
// ──────────────────────────────────────────────────────────────────────────────

/// Send a request and return (status, body).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<&Value>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap_or_default();

    collect(app, request).await
}

pub async fn collect(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap_or_default();

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();
    let body_str = String::from_utf8(body.to_vec()).unwrap_or_default();

    (status, body_str)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, String) {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, String) {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_with_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: &Value,
) -> (StatusCode, String) {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_with_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: &Value,
) -> (StatusCode, String) {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn patch_json_with_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: &Value,
) -> (StatusCode, String) {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, String) {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_default()
}

/// The `id` field of a JSON body.
pub fn id_of(body: &str) -> String {
    json(body)["id"].as_str().unwrap_or_default().to_string()
}

// ──────────────────────────────────────────────────────────────────────────────
// Fixtures
// ──────────────────────────────────────────────────────────────────────────────

pub struct TestUser {
    pub id: String,
    pub token: String,
    pub refresh_token: String,
}

/// Register through the API.
pub async fn register(app: &Router, name: &str, email: &str) -> TestUser {
    let (status, body) = post_json(
        app,
        "/api/v1/auth/register",
        &json!({ "name": name, "email": email, "password": "Password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    let json = json(&body);
    TestUser {
        id: json["user"]["id"].as_str().unwrap_or_default().to_string(),
        token: json["token"].as_str().unwrap_or_default().to_string(),
        refresh_token: json["refreshToken"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Register a user and grant it the admin role directly in the database.
pub async fn register_admin(app: &Router, state: &AppState) -> TestUser {
    let admin = register(app, "Admin", "admin@example.com").await;
    let id: Uuid = admin.id.parse().unwrap_or_default();
    let promoted = user::Entity::update_many()
        .col_expr(user::Column::Role, Expr::value(user::ROLE_ADMIN))
        .filter(user::Column::Id.eq(id))
        .exec(&state.db)
        .await;
    assert!(promoted.is_ok(), "promote to admin failed");
    admin
}

/// Create a game and a card base in it; returns (`game_id`, `card_base_id`).
pub async fn seed_catalog(app: &Router, admin_token: &str, game: &str, card: &str) -> (String, String) {
    let (status, body) =
        post_json_with_auth(app, "/api/v1/games", admin_token, &json!({ "name": game })).await;
    assert_eq!(status, StatusCode::CREATED, "create game failed: {body}");
    let game_id = id_of(&body);

    let card_base_id = create_card_base(app, admin_token, &game_id, card).await;
    (game_id, card_base_id)
}

pub async fn create_card_base(app: &Router, admin_token: &str, game_id: &str, name: &str) -> String {
    let (status, body) = post_json_with_auth(
        app,
        "/api/v1/card-bases",
        admin_token,
        &json!({ "gameId": game_id, "nameCard": name }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create card base failed: {body}");
    id_of(&body)
}

pub async fn create_card(app: &Router, token: &str, card_base_id: &str) -> String {
    let (status, body) = post_json_with_auth(
        app,
        "/api/v1/cards",
        token,
        &json!({ "cardBaseId": card_base_id, "statusCard": 8 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create card failed: {body}");
    id_of(&body)
}

/// Publish `card_id` asking for money; returns the publication id.
pub async fn create_publication(app: &Router, token: &str, card_id: &str, name: &str) -> String {
    let (status, body) = post_json_with_auth(
        app,
        "/api/v1/publications",
        token,
        &json!({ "name": name, "cardId": card_id, "valueMoney": 25.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create publication failed: {body}");
    id_of(&body)
}

/// Offer money on a publication; returns the offer id.
pub async fn create_money_offer(app: &Router, token: &str, publication_id: &str, amount: f64) -> String {
    let (status, body) = post_json_with_auth(
        app,
        "/api/v1/offers",
        token,
        &json!({ "publicationId": publication_id, "moneyOffer": amount }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create offer failed: {body}");
    id_of(&body)
}

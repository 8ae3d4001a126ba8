mod common;

use axum::http::StatusCode;
use serde_json::json;

// ──────────────────────────────────────────────────────────────────────────────
// Register
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_success() {
    let (app, _state) = common::test_app().await;
    let (status, body) = common::post_json(
        &app,
        "/api/v1/auth/register",
        &json!({
            "name": "Ash Ketchum",
            "email": "  Ash@Example.com ",
            "password": "Pikachu123",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    let json = common::json(&body);
    assert_eq!(json["user"]["email"], "ash@example.com");
    assert_eq!(json["user"]["name"], "Ash Ketchum");
    assert_eq!(json["user"]["role"], "user");
    assert!(json["user"].get("passwordHash").is_none());
    assert!(json["user"].get("password_hash").is_none());
    assert!(json["token"].is_string());
    assert!(json["refreshToken"].is_string());
}

#[tokio::test]
async fn register_duplicate_email_conflicts() {
    let (app, _state) = common::test_app().await;
    common::register(&app, "First", "dup@example.com").await;

    let (status, body) = common::post_json(
        &app,
        "/api/v1/auth/register",
        &json!({ "name": "Second", "email": "DUP@example.com", "password": "Password123" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    let json = common::json(&body);
    assert_eq!(json["error"]["code"], "CONFLICT");
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap_or_default()
            .contains("Email")
    );
}

#[tokio::test]
async fn register_validates_body() {
    let (app, _state) = common::test_app().await;

    let (status, body) = common::post_json(
        &app,
        "/api/v1/auth/register",
        &json!({ "name": "Short Pass", "email": "short@example.com", "password": "123" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        common::json(&body)["error"]["message"]
            .as_str()
            .unwrap_or_default()
            .contains("Password")
    );

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/register",
        &json!({ "name": "Bad Email", "email": "not-an-email", "password": "Password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/register",
        &json!({ "email": "missing@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ──────────────────────────────────────────────────────────────────────────────
// Login / me
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_success_records_last_login() {
    let (app, _state) = common::test_app().await;
    common::register(&app, "Misty", "misty@example.com").await;

    let (status, body) = common::post_json(
        &app,
        "/api/v1/auth/login",
        &json!({ "email": "misty@example.com", "password": "Password123" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let json = common::json(&body);
    assert_eq!(json["user"]["email"], "misty@example.com");
    assert!(json["user"]["lastLoginAt"].is_string());
    assert!(json["token"].is_string());
}

#[tokio::test]
async fn login_wrong_password_is_unauthorized() {
    let (app, _state) = common::test_app().await;
    common::register(&app, "Brock", "brock@example.com").await;

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/login",
        &json!({ "email": "brock@example.com", "password": "WrongPassword" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/login",
        &json!({ "email": "nobody@example.com", "password": "Password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_bearer_token() {
    let (app, _state) = common::test_app().await;
    let user = common::register(&app, "Gary", "gary@example.com").await;

    let (status, _body) = common::get(&app, "/api/v1/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _body) = common::get_with_auth(&app, "/api/v1/auth/me", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = common::get_with_auth(&app, "/api/v1/auth/me", &user.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(common::json(&body)["id"], user.id);
}

#[tokio::test]
async fn refresh_token_cannot_be_used_as_access_token() {
    let (app, _state) = common::test_app().await;
    let user = common::register(&app, "Rocket", "rocket@example.com").await;

    let (status, _body) =
        common::get_with_auth(&app, "/api/v1/auth/me", &user.refresh_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ──────────────────────────────────────────────────────────────────────────────
// Refresh / logout
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_rotates_tokens() {
    let (app, _state) = common::test_app().await;
    let user = common::register(&app, "Oak", "oak@example.com").await;

    let (status, body) = common::post_json(
        &app,
        "/api/v1/auth/refresh",
        &json!({ "refreshToken": user.refresh_token }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = common::json(&body);
    let new_refresh = json["refreshToken"].as_str().unwrap_or_default().to_string();
    assert!(!new_refresh.is_empty());
    assert_ne!(new_refresh, user.refresh_token);

    // The old refresh token was revoked by the rotation.
    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/refresh",
        &json!({ "refreshToken": user.refresh_token }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/refresh",
        &json!({ "refreshToken": new_refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_token_rotates_once_under_concurrent_use() {
    let (app, _state) = common::test_app().await;
    let user = common::register(&app, "Elm", "elm@example.com").await;
    let body = json!({ "refreshToken": user.refresh_token });

    let (first, second) = tokio::join!(
        common::post_json(&app, "/api/v1/auth/refresh", &body),
        common::post_json(&app, "/api/v1/auth/refresh", &body),
    );
    let mut statuses = [first.0.as_u16(), second.0.as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 401], "{} / {}", first.1, second.1);

    let winner = if first.0 == StatusCode::OK { first.1 } else { second.1 };
    let new_refresh = common::json(&winner)["refreshToken"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/refresh",
        &json!({ "refreshToken": new_refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let (app, _state) = common::test_app().await;
    let user = common::register(&app, "Jessie", "jessie@example.com").await;

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/refresh",
        &json!({ "refreshToken": user.token }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_refresh_token() {
    let (app, _state) = common::test_app().await;
    let user = common::register(&app, "James", "james@example.com").await;

    let (status, _body) = common::post_json_with_auth(
        &app,
        "/api/v1/auth/logout",
        &user.token,
        &json!({ "refreshToken": user.refresh_token }),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/refresh",
        &json!({ "refreshToken": user.refresh_token }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

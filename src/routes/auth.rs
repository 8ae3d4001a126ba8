use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::auth::{jwt, password};
use crate::dto::UserResponse;
use crate::entities::{refresh_token, user};
use crate::error::AppError;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the auth route group: `/auth/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refreshToken is required"))]
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Persist a refresh token record so it can be rotated or revoked later.
async fn store_refresh_token(
    db: &DatabaseConnection,
    user_id: Uuid,
    token_pair: &jwt::TokenPair,
) -> Result<(), AppError> {
    let record = refresh_token::ActiveModel {
        id: Set(token_pair.refresh_jti),
        user_id: Set(user_id),
        expires_at: Set(token_pair.refresh_expires_at.fixed_offset()),
        revoked_at: Set(None),
        created_at: Set(Utc::now().fixed_offset()),
    };
    record.insert(db).await?;
    Ok(())
}

/// Issue a token pair for `user_model` and wrap it with the user profile.
async fn issue_tokens(state: &AppState, user_model: &user::Model) -> Result<AuthResponse, AppError> {
    let token_pair = jwt::generate_token_pair(user_model, &state.config)?;
    store_refresh_token(&state.db, user_model.id, &token_pair).await?;

    Ok(AuthResponse {
        user: UserResponse::from(user_model),
        token: token_pair.access_token,
        refresh_token: token_pair.refresh_token,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/v1/auth/register`
async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = password::normalize_email(&body.email);

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(&body.password)?;
    let now = Utc::now().fixed_offset();

    let new_user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(body.name.trim().to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(user::ROLE_USER.to_string()),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    let user_model = new_user.insert(&state.db).await?;

    tracing::info!(user_id = %user_model.id, "User registered");

    let response = issue_tokens(&state, &user_model).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/v1/auth/login`
async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = password::normalize_email(&body.email);

    let user_model = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .filter(user::Column::DeletedAt.is_null())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password.".to_string()))?;

    if !password::verify_password(&body.password, &user_model.password_hash)? {
        tracing::debug!(user_id = %user_model.id, "Rejected login with wrong password");
        return Err(AppError::Unauthorized(
            "Invalid email or password.".to_string(),
        ));
    }

    let now = Utc::now().fixed_offset();
    let mut active_user: user::ActiveModel = user_model.into();
    active_user.last_login_at = Set(Some(now));
    active_user.updated_at = Set(now);
    let user_model = active_user.update(&state.db).await?;

    Ok(Json(issue_tokens(&state, &user_model).await?))
}

/// `GET /api/v1/auth/me`
async fn me(AuthUser(user_model): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user_model))
}

/// `POST /api/v1/auth/refresh`
///
/// Rotates the refresh token: the presented one is revoked and a new pair issued.
async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let claims = jwt::validate_refresh_token(&body.refresh_token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired refresh token.".to_string()))?;

    let jti: Uuid = claims
        .jti
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid refresh token.".to_string()))?;

    let token_record = refresh_token::Entity::find_by_id(jti)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Refresh token not found.".to_string()))?;

    // Revoke-if-live in one statement so a token rotates at most once.
    let revoked = refresh_token::Entity::update_many()
        .col_expr(
            refresh_token::Column::RevokedAt,
            Expr::value(Some(Utc::now().fixed_offset())),
        )
        .filter(refresh_token::Column::Id.eq(token_record.id))
        .filter(refresh_token::Column::RevokedAt.is_null())
        .exec(&state.db)
        .await?;
    if revoked.rows_affected != 1 {
        tracing::warn!(user_id = %token_record.user_id, "Revoked refresh token presented");
        return Err(AppError::Unauthorized(
            "Refresh token has been revoked.".to_string(),
        ));
    }

    let user_id = claims
        .user_uuid()
        .map_err(|_| AppError::Unauthorized("Invalid token subject.".to_string()))?;
    let user_model = user::Entity::find_by_id(user_id)
        .filter(user::Column::DeletedAt.is_null())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found.".to_string()))?;

    Ok(Json(issue_tokens(&state, &user_model).await?))
}

/// `POST /api/v1/auth/logout`
async fn logout(
    State(state): State<AppState>,
    AuthUser(user_model): AuthUser,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> Result<StatusCode, AppError> {
    if let Ok(claims) = jwt::validate_refresh_token(&body.refresh_token, &state.config.jwt_secret)
        && let Ok(jti) = claims.jti.parse::<Uuid>()
        && let Some(record) = refresh_token::Entity::find_by_id(jti)
            .filter(refresh_token::Column::UserId.eq(user_model.id))
            .one(&state.db)
            .await?
    {
        let mut active_token: refresh_token::ActiveModel = record.into();
        active_token.revoked_at = Set(Some(Utc::now().fixed_offset()));
        active_token.update(&state.db).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::{AdminUser, AuthUser};
use crate::auth::password;
use crate::dto::{Paginated, PaginationQuery, UserResponse};
use crate::entities::user;
use crate::error::AppError;
use crate::extractors::ValidatedJson;
use crate::services::{TradeService, lookup};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the user route group: `/users/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct CreateUserRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    name: String,
    #[validate(email(message = "Invalid email format"))]
    email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    password: String,
    role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateUserRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    email: Option<String>,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    password: Option<String>,
    role: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse_role(raw: &str) -> Result<&'static str, AppError> {
    match raw {
        user::ROLE_USER => Ok(user::ROLE_USER),
        user::ROLE_ADMIN => Ok(user::ROLE_ADMIN),
        _ => Err(AppError::BadRequest(
            "Role must be 'user' or 'admin'".to_string(),
        )),
    }
}

/// 409 if another account already uses `email`.
async fn ensure_email_free(
    db: &DatabaseConnection,
    email: &str,
    except: Option<Uuid>,
) -> Result<(), AppError> {
    let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(AppError::Conflict("Email is already in use.".to_string()));
    }
    Ok(())
}

/// Only the account itself or an admin may change it.
fn ensure_self_or_admin(actor: &user::Model, target: Uuid) -> Result<(), AppError> {
    if actor.id != target && !actor.is_admin() {
        return Err(AppError::Forbidden(
            "You can only modify your own account.".to_string(),
        ));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/v1/users`: Admin creates an account.
async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidatedJson(body): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = parse_role(body.role.as_deref().unwrap_or(user::ROLE_USER))?;
    let email = password::normalize_email(&body.email);
    ensure_email_free(&state.db, &email, None).await?;

    let now = Utc::now().fixed_offset();
    let new_user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(body.name.trim().to_string()),
        email: Set(email),
        password_hash: Set(password::hash_password(&body.password)?),
        role: Set(role.to_string()),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    let user_model = new_user.insert(&state.db).await?;

    tracing::info!(user_id = %user_model.id, admin_id = %admin.id, "User created by admin");

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user_model))))
}

/// `GET /api/v1/users`
async fn list_users(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Paginated<UserResponse>>, AppError> {
    let limit = pagination.limit();
    let query = user::Entity::find().filter(user::Column::DeletedAt.is_null());

    let total = query.clone().count(&state.db).await?;
    let users = query
        .order_by_asc(user::Column::CreatedAt)
        .offset(pagination.offset)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(Paginated::new(
        users.iter().map(UserResponse::from).collect(),
        total,
        pagination.offset,
        limit,
    )))
}

/// `GET /api/v1/users/{id}`
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user_model = lookup::find_active_user(&state.db, id).await?;
    Ok(Json(UserResponse::from(&user_model)))
}

/// `PUT /api/v1/users/{id}`
async fn update_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    ensure_self_or_admin(&actor, id)?;
    let target = lookup::find_active_user(&state.db, id).await?;

    let role = match body.role.as_deref() {
        Some(raw) if raw != target.role => {
            if !actor.is_admin() {
                return Err(AppError::Forbidden(
                    "Only admins can change roles.".to_string(),
                ));
            }
            Some(parse_role(raw)?)
        }
        _ => None,
    };

    let email = match body.email.as_deref().map(password::normalize_email) {
        Some(email) if email != target.email => {
            ensure_email_free(&state.db, &email, Some(target.id)).await?;
            Some(email)
        }
        _ => None,
    };

    let mut active: user::ActiveModel = target.into();
    if let Some(name) = body.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(new_password) = body.password {
        active.password_hash = Set(password::hash_password(&new_password)?);
    }
    if let Some(role) = role {
        active.role = Set(role.to_string());
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let user_model = active.update(&state.db).await?;
    Ok(Json(UserResponse::from(&user_model)))
}

/// `DELETE /api/v1/users/{id}`: Soft delete.
async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ensure_self_or_admin(&actor, id)?;
    let target = lookup::find_active_user(&state.db, id).await?;

    TradeService::deactivate_user(&state.db, target.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("admin").ok(), Some(user::ROLE_ADMIN));
        assert_eq!(parse_role("user").ok(), Some(user::ROLE_USER));
        assert!(parse_role("moderator").is_err());
        assert!(parse_role("ADMIN").is_err());
    }
}

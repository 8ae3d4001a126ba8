use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AdminUser;
use crate::dto::Paginated;
use crate::dto::pagination::{clamp_limit, default_limit, default_offset};
use crate::entities::{card_base, game};
use crate::error::AppError;
use crate::extractors::{ValidatedJson, required_text};
use crate::services::lookup;
use crate::state::AppState;

/// Game catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_games).post(create_game))
        .route("/{id}", get(get_game).put(update_game).delete(delete_game))
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
struct GameRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    name: String,
}

#[derive(Debug, Deserialize)]
struct GameListQuery {
    #[serde(default = "default_offset")]
    offset: u64,
    #[serde(default = "default_limit")]
    limit: u64,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GameResponse {
    id: Uuid,
    name: String,
    created_at: String,
    updated_at: String,
}

impl From<game::Model> for GameResponse {
    fn from(g: game::Model) -> Self {
        Self {
            id: g.id,
            name: g.name,
            created_at: g.created_at.to_rfc3339(),
            updated_at: g.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /games`: Create a game.
async fn create_game(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ValidatedJson(req): ValidatedJson<GameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = required_text(&req.name, "name")?;
    ensure_name_free(&state.db, &name, None).await?;

    let now = Utc::now().fixed_offset();
    let game = game::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let game = game.insert(&state.db).await?;

    tracing::info!(game_id = %game.id, "Game created");

    Ok((StatusCode::CREATED, Json(GameResponse::from(game))))
}

/// `GET /games`: List games, optionally filtered by a name substring.
async fn list_games(
    State(state): State<AppState>,
    Query(query): Query<GameListQuery>,
) -> Result<Json<Paginated<GameResponse>>, AppError> {
    let limit = clamp_limit(query.limit);

    let mut select = game::Entity::find();
    if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        select = select.filter(game::Column::Name.contains(name));
    }

    let total = select.clone().count(&state.db).await?;
    let games = select
        .order_by_asc(game::Column::Name)
        .offset(query.offset)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(Paginated::new(
        games.into_iter().map(GameResponse::from).collect(),
        total,
        query.offset,
        limit,
    )))
}

/// `GET /games/{id}`: Get a game by ID.
async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameResponse>, AppError> {
    let game = lookup::find_game(&state.db, id).await?;
    Ok(Json(GameResponse::from(game)))
}

/// `PUT /games/{id}`: Rename a game.
async fn update_game(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<GameRequest>,
) -> Result<Json<GameResponse>, AppError> {
    let game = lookup::find_game(&state.db, id).await?;
    let name = required_text(&req.name, "name")?;
    ensure_name_free(&state.db, &name, Some(id)).await?;

    let mut active: game::ActiveModel = game.into();
    active.name = Set(name);
    active.updated_at = Set(Utc::now().fixed_offset());
    let game = active.update(&state.db).await?;

    Ok(Json(GameResponse::from(game)))
}

/// `DELETE /games/{id}`: Delete a game with no card bases.
async fn delete_game(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let game = lookup::find_game(&state.db, id).await?;

    let card_bases = game
        .find_related(card_base::Entity)
        .count(&state.db)
        .await?;
    if card_bases > 0 {
        return Err(AppError::Conflict(
            "Game still has card bases".to_string(),
        ));
    }

    game.delete(&state.db).await?;
    tracing::info!(game_id = %id, "Game deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_name_free(
    db: &DatabaseConnection,
    name: &str,
    except: Option<Uuid>,
) -> Result<(), AppError> {
    let mut query = game::Entity::find().filter(game::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(game::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(AppError::Conflict(format!("Game '{name}' already exists")));
    }
    Ok(())
}

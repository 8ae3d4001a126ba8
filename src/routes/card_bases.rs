use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AdminUser;
use crate::dto::{Paginated, PaginationQuery};
use crate::entities::{PublicationStatus, card, card_base, publication, publication_card_base};
use crate::error::AppError;
use crate::extractors::{ValidatedJson, required_text};
use crate::services::lookup;
use crate::state::AppState;

/// Card base catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_card_bases).post(create_card_base))
        .route("/game/{game_id}", get(list_card_bases_by_game))
        .route(
            "/{id}",
            get(get_card_base)
                .put(update_card_base)
                .delete(delete_card_base),
        )
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateCardBaseRequest {
    game_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "nameCard must be 1-100 characters"))]
    name_card: String,
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateCardBaseRequest {
    game_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100, message = "nameCard must be 1-100 characters"))]
    name_card: Option<String>,
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CardBaseResponse {
    id: Uuid,
    game_id: Uuid,
    name_card: String,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<card_base::Model> for CardBaseResponse {
    fn from(b: card_base::Model) -> Self {
        Self {
            id: b.id,
            game_id: b.game_id,
            name_card: b.name_card,
            description: b.description,
            created_at: b.created_at.to_rfc3339(),
            updated_at: b.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /card-bases`: Add a card base to a game.
async fn create_card_base(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ValidatedJson(req): ValidatedJson<CreateCardBaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name_card = required_text(&req.name_card, "nameCard")?;
    let game = lookup::find_game(&state.db, req.game_id).await?;
    ensure_unique(&state.db, game.id, &name_card, None).await?;

    let now = Utc::now().fixed_offset();
    let base = card_base::ActiveModel {
        id: Set(Uuid::new_v4()),
        game_id: Set(game.id),
        name_card: Set(name_card),
        description: Set(req.description),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let base = base.insert(&state.db).await?;

    tracing::info!(card_base_id = %base.id, game_id = %game.id, "Card base created");

    Ok((StatusCode::CREATED, Json(CardBaseResponse::from(base))))
}

/// `GET /card-bases`: List every card base.
async fn list_card_bases(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Paginated<CardBaseResponse>>, AppError> {
    let limit = pagination.limit();
    let select = card_base::Entity::find();

    let total = select.clone().count(&state.db).await?;
    let bases = select
        .order_by_asc(card_base::Column::NameCard)
        .offset(pagination.offset)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(Paginated::new(
        bases.into_iter().map(CardBaseResponse::from).collect(),
        total,
        pagination.offset,
        limit,
    )))
}

/// `GET /card-bases/game/{gameId}`: List the card bases of one game.
async fn list_card_bases_by_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Paginated<CardBaseResponse>>, AppError> {
    let game = lookup::find_game(&state.db, game_id).await?;
    let limit = pagination.limit();
    let select = game.find_related(card_base::Entity);

    let total = select.clone().count(&state.db).await?;
    let bases = select
        .order_by_asc(card_base::Column::NameCard)
        .offset(pagination.offset)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(Paginated::new(
        bases.into_iter().map(CardBaseResponse::from).collect(),
        total,
        pagination.offset,
        limit,
    )))
}

/// `GET /card-bases/{id}`
async fn get_card_base(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CardBaseResponse>, AppError> {
    let base = lookup::find_card_base(&state.db, id).await?;
    Ok(Json(CardBaseResponse::from(base)))
}

/// `PUT /card-bases/{id}`
async fn update_card_base(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCardBaseRequest>,
) -> Result<Json<CardBaseResponse>, AppError> {
    let name_card = req
        .name_card
        .as_deref()
        .map(|n| required_text(n, "nameCard"))
        .transpose()?;
    let base = lookup::find_card_base(&state.db, id).await?;

    let game_id = match req.game_id {
        Some(game_id) if game_id != base.game_id => lookup::find_game(&state.db, game_id).await?.id,
        _ => base.game_id,
    };
    let name_card = name_card.unwrap_or_else(|| base.name_card.clone());

    if game_id != base.game_id || name_card != base.name_card {
        ensure_unique(&state.db, game_id, &name_card, Some(id)).await?;
    }

    let mut active: card_base::ActiveModel = base.into();
    active.game_id = Set(game_id);
    active.name_card = Set(name_card);
    if let Some(description) = req.description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    let base = active.update(&state.db).await?;

    Ok(Json(CardBaseResponse::from(base)))
}

/// `DELETE /card-bases/{id}`: Only allowed once no card instantiates it.
async fn delete_card_base(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let base = lookup::find_card_base(&state.db, id).await?;

    let cards = base.find_related(card::Entity).count(&state.db).await?;
    if cards > 0 {
        return Err(AppError::Conflict(
            "CardBase is still referenced by cards".to_string(),
        ));
    }

    let open_wants = publication_card_base::Entity::find()
        .join(JoinType::InnerJoin, publication_card_base::Relation::Publication.def())
        .filter(publication_card_base::Column::CardBaseId.eq(id))
        .filter(publication::Column::Status.eq(PublicationStatus::Open.as_str()))
        .count(&state.db)
        .await?;
    if open_wants > 0 {
        return Err(AppError::Conflict(
            "CardBase is wanted by an open publication".to_string(),
        ));
    }

    base.delete(&state.db).await?;
    tracing::info!(card_base_id = %id, "Card base deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// `(gameId, nameCard)` must be unique.
async fn ensure_unique(
    db: &DatabaseConnection,
    game_id: Uuid,
    name_card: &str,
    except: Option<Uuid>,
) -> Result<(), AppError> {
    let mut query = card_base::Entity::find()
        .filter(card_base::Column::GameId.eq(game_id))
        .filter(card_base::Column::NameCard.eq(name_card));
    if let Some(id) = except {
        query = query.filter(card_base::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "CardBase '{name_card}' already exists in this game"
        )));
    }
    Ok(())
}

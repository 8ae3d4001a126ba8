use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::pagination::{clamp_limit, default_limit, default_offset};
use crate::dto::{CardResponse, Paginated};
use crate::entities::{card, card_base, user};
use crate::error::AppError;
use crate::extractors::ValidatedJson;
use crate::services::{TradeService, lookup};
use crate::state::AppState;

/// Largest accepted card image.
const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
/// Public URL prefix of uploaded card images, mounted from `{upload_dir}/cards`.
const CARD_IMAGE_URL_PREFIX: &str = "/uploads/cards/";

/// Card inventory router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cards).post(create_card))
        .route("/{id}", get(get_card).put(update_card).delete(delete_card))
        .route(
            "/{id}/image",
            // Leave headroom over the file limit for the multipart framing.
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + 64 * 1024)),
        )
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateCardRequest {
    card_base_id: Uuid,
    #[validate(range(min = 1, max = 10, message = "statusCard must be between 1 and 10"))]
    status_card: i32,
    #[validate(length(max = 2048, message = "urlImage must be at most 2048 characters"))]
    url_image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateCardRequest {
    card_base_id: Option<Uuid>,
    #[validate(range(min = 1, max = 10, message = "statusCard must be between 1 and 10"))]
    status_card: Option<i32>,
    #[validate(length(max = 2048, message = "urlImage must be at most 2048 characters"))]
    url_image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardListQuery {
    #[serde(default = "default_offset")]
    offset: u64,
    #[serde(default = "default_limit")]
    limit: u64,
    owner_id: Option<Uuid>,
    card_base_id: Option<Uuid>,
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /cards`: Add a card to the caller's inventory.
async fn create_card(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateCardRequest>,
) -> Result<impl IntoResponse, AppError> {
    let base = lookup::find_card_base(&state.db, req.card_base_id).await?;

    let now = Utc::now().fixed_offset();
    let card = card::ActiveModel {
        id: Set(Uuid::new_v4()),
        card_base_id: Set(base.id),
        owner_id: Set(owner.id),
        status_card: Set(req.status_card),
        url_image: Set(req.url_image),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let card = card.insert(&state.db).await?;

    tracing::info!(card_id = %card.id, owner_id = %owner.id, "Card created");

    Ok((StatusCode::CREATED, Json(CardResponse::new(card, Some(&base)))))
}

/// `GET /cards`: List cards, optionally filtered by owner or card base.
async fn list_cards(
    State(state): State<AppState>,
    Query(query): Query<CardListQuery>,
) -> Result<Json<Paginated<CardResponse>>, AppError> {
    let limit = clamp_limit(query.limit);

    let mut select = card::Entity::find();
    if let Some(owner_id) = query.owner_id {
        select = select.filter(card::Column::OwnerId.eq(owner_id));
    }
    if let Some(card_base_id) = query.card_base_id {
        select = select.filter(card::Column::CardBaseId.eq(card_base_id));
    }

    let total = select.clone().count(&state.db).await?;
    let rows = select
        .order_by_desc(card::Column::CreatedAt)
        .offset(query.offset)
        .limit(limit)
        .find_also_related(card_base::Entity)
        .all(&state.db)
        .await?;

    let data = rows
        .into_iter()
        .map(|(card, base)| CardResponse::new(card, base.as_ref()))
        .collect();

    Ok(Json(Paginated::new(data, total, query.offset, limit)))
}

/// `GET /cards/{id}`
async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CardResponse>, AppError> {
    let card = lookup::find_card(&state.db, id).await?;
    let base = card.find_related(card_base::Entity).one(&state.db).await?;
    Ok(Json(CardResponse::new(card, base.as_ref())))
}

/// `PUT /cards/{id}`: Owner updates the card.
async fn update_card(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCardRequest>,
) -> Result<Json<CardResponse>, AppError> {
    let card = lookup::find_card(&state.db, id).await?;
    ensure_owner(&card, &actor)?;

    let base = match req.card_base_id {
        Some(card_base_id) => lookup::find_card_base(&state.db, card_base_id).await?,
        None => lookup::find_card_base(&state.db, card.card_base_id).await?,
    };

    let mut active: card::ActiveModel = card.into();
    active.card_base_id = Set(base.id);
    if let Some(status_card) = req.status_card {
        active.status_card = Set(status_card);
    }
    if let Some(url_image) = req.url_image {
        active.url_image = Set(Some(url_image));
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    let card = active.update(&state.db).await?;

    Ok(Json(CardResponse::new(card, Some(&base))))
}

/// `DELETE /cards/{id}`: Owner removes a card that is not tied up in a trade.
async fn delete_card(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let card = lookup::find_card(&state.db, id).await?;
    ensure_owner(&card, &actor)?;

    if TradeService::card_is_listed(&state.db, card.id).await? {
        return Err(AppError::Conflict(
            "Card is listed in an open publication".to_string(),
        ));
    }
    if TradeService::card_in_pending_offer(&state.db, card.id).await? {
        return Err(AppError::Conflict(
            "Card is proposed in a pending offer".to_string(),
        ));
    }
    if TradeService::card_has_completed_trade(&state.db, card.id).await? {
        return Err(AppError::Conflict(
            "Card is part of a completed trade".to_string(),
        ));
    }

    TradeService::delete_card(&state.db, card.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// `POST /cards/{id}/image`: Upload the card picture and point `urlImage` at it.
async fn upload_image(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<CardResponse>, AppError> {
    let card = lookup::find_card(&state.db, id).await?;
    ensure_owner(&card, &actor)?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart data: {e}")))?
        .ok_or_else(|| AppError::BadRequest("No file field provided.".to_string()))?;

    let file_name = field.file_name().unwrap_or_default().to_string();
    let extension = image_extension(&file_name).ok_or_else(|| {
        AppError::BadRequest(
            "Unsupported file type. Allowed: PNG, JPG, JPEG, GIF, WEBP.".to_string(),
        )
    })?;

    let data = field.bytes().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge("File exceeds the 5 MB size limit.".to_string())
        } else {
            AppError::BadRequest(format!("Failed to read file data: {e}"))
        }
    })?;

    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty.".to_string()));
    }
    if data.len() > MAX_IMAGE_SIZE {
        return Err(AppError::PayloadTooLarge(
            "File exceeds the 5 MB size limit.".to_string(),
        ));
    }

    let upload_dir = std::path::Path::new(&state.config.upload_dir).join("cards");
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create upload dir: {e}")))?;

    let stored_name = format!("{}-{}.{extension}", card.id, Uuid::new_v4());
    let stored_path = upload_dir.join(&stored_name);
    tokio::fs::write(&stored_path, &data)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to write file: {e}")))?;

    let previous = card.url_image.clone();
    let mut active: card::ActiveModel = card.into();
    active.url_image = Set(Some(format!("{CARD_IMAGE_URL_PREFIX}{stored_name}")));
    active.updated_at = Set(Utc::now().fixed_offset());
    let card = discard_on_error(active.update(&state.db).await, &stored_path).await?;

    if let Some(old_name) = previous.as_deref().and_then(stored_image_name) {
        // A stale file is harmless; only log.
        if let Err(e) = tokio::fs::remove_file(upload_dir.join(old_name)).await {
            tracing::debug!(card_id = %card.id, error = %e, "Could not remove previous image");
        }
    }

    tracing::info!(card_id = %card.id, bytes = data.len(), "Card image uploaded");

    let base = card.find_related(card_base::Entity).one(&state.db).await?;
    Ok(Json(CardResponse::new(card, base.as_ref())))
}

fn ensure_owner(card: &card::Model, actor: &user::Model) -> Result<(), AppError> {
    if card.owner_id != actor.id {
        return Err(AppError::Forbidden("You do not own this card".to_string()));
    }
    Ok(())
}

/// File name of an image this service stored, or `None` for any other URL.
///
/// `urlImage` is client-writable, so only a bare file name under the card
/// image prefix is accepted.
fn stored_image_name(url: &str) -> Option<&str> {
    let name = url.strip_prefix(CARD_IMAGE_URL_PREFIX)?;
    let bare = std::path::Path::new(name).file_name() == Some(std::ffi::OsStr::new(name));
    (bare && !name.contains(['/', '\\']) && !name.starts_with('.')).then_some(name)
}

/// Pass `result` through, deleting the freshly written file at `path` on error.
async fn discard_on_error<T>(
    result: Result<T, sea_orm::DbErr>,
    path: &std::path::Path,
) -> Result<T, AppError> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::warn!(path = %path.display(), error = %e, "Could not remove orphaned image");
            }
            Err(err.into())
        }
    }
}

/// Lower-cased extension of `file_name` if it is an accepted image type.
fn image_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::pagination::{clamp_limit, default_limit, default_offset};
use crate::dto::{OfferResponse, Paginated};
use crate::entities::{OfferStatus, PublicationStatus, card, offer, offer_card, publication, user};
use crate::error::AppError;
use crate::extractors::ValidatedJson;
use crate::services::{TradeService, lookup};
use crate::state::AppState;

/// Offer router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_offers).post(create_offer))
        .route("/{id}", get(get_offer).patch(update_offer_status))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateOfferRequest {
    publication_id: Uuid,
    #[validate(range(min = 0.0, message = "moneyOffer must not be negative"))]
    money_offer: Option<f64>,
    /// The offerer's own cards.
    #[serde(default)]
    card_exchange_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateOfferStatusRequest {
    #[validate(length(min = 1, message = "statusOffer is required"))]
    status_offer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferListQuery {
    #[serde(default = "default_offset")]
    offset: u64,
    #[serde(default = "default_limit")]
    limit: u64,
    publication_id: Option<Uuid>,
    user_id: Option<Uuid>,
    status: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /offers`: Make an offer on someone else's open publication.
async fn create_offer(
    State(state): State<AppState>,
    AuthUser(offerer): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateOfferRequest>,
) -> Result<impl IntoResponse, AppError> {
    let card_ids = lookup::dedup_ids(req.card_exchange_ids);
    if req.money_offer.is_none() && card_ids.is_empty() {
        return Err(AppError::BadRequest(
            "Provide moneyOffer, cardExchangeIds, or both".to_string(),
        ));
    }

    let publication = lookup::find_publication(&state.db, req.publication_id).await?;
    if publication.owner_id == offerer.id {
        return Err(AppError::Forbidden(
            "You cannot make an offer on your own publication".to_string(),
        ));
    }
    if !PublicationStatus::from_str(&publication.status).is_some_and(|s| s.is_open()) {
        return Err(AppError::Conflict(
            "Publication is not open for offers".to_string(),
        ));
    }
    if TradeService::has_pending_offer(&state.db, publication.id, offerer.id).await? {
        return Err(AppError::Conflict(
            "You already have a pending offer on this publication".to_string(),
        ));
    }
    ensure_cards_owned(&state, &card_ids, offerer.id).await?;

    let now = Utc::now().fixed_offset();
    let txn = state.db.begin().await?;
    TradeService::lock_open_publication(&txn, publication.id).await?;

    let offer = offer::ActiveModel {
        id: Set(Uuid::new_v4()),
        publication_id: Set(publication.id),
        user_id: Set(offerer.id),
        money_offer: Set(req.money_offer),
        status: Set(OfferStatus::Pending.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(|e| {
        AppError::conflict_on_duplicate(e, "You already have a pending offer on this publication")
    })?;

    if !card_ids.is_empty() {
        let rows = card_ids.iter().map(|card_id| offer_card::ActiveModel {
            offer_id: Set(offer.id),
            card_id: Set(*card_id),
        });
        offer_card::Entity::insert_many(rows)
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;

    tracing::info!(
        offer_id = %offer.id,
        publication_id = %publication.id,
        user_id = %offerer.id,
        cards = card_ids.len(),
        "Offer created"
    );

    Ok((StatusCode::CREATED, Json(OfferResponse::new(offer, card_ids))))
}

/// `GET /offers`: Offers the caller made or received; admins see all.
async fn list_offers(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<OfferListQuery>,
) -> Result<Json<Paginated<OfferResponse>>, AppError> {
    let limit = clamp_limit(query.limit);

    let mut select = offer::Entity::find();
    if !actor.is_admin() {
        select = select
            .join(JoinType::InnerJoin, offer::Relation::Publication.def())
            .filter(
                Condition::any()
                    .add(offer::Column::UserId.eq(actor.id))
                    .add(publication::Column::OwnerId.eq(actor.id)),
            );
    }
    if let Some(publication_id) = query.publication_id {
        select = select.filter(offer::Column::PublicationId.eq(publication_id));
    }
    if let Some(user_id) = query.user_id {
        select = select.filter(offer::Column::UserId.eq(user_id));
    }
    if let Some(raw) = query.status.as_deref() {
        select = select.filter(offer::Column::Status.eq(parse_status(raw)?.as_str()));
    }

    let total = select.clone().count(&state.db).await?;
    let offers = select
        .order_by_desc(offer::Column::CreatedAt)
        .offset(query.offset)
        .limit(limit)
        .all(&state.db)
        .await?;

    let mut offered_cards =
        lookup::offer_card_ids_many(&state.db, offers.iter().map(|o| o.id).collect()).await?;
    let data = offers
        .into_iter()
        .map(|o| {
            let ids = offered_cards.remove(&o.id).unwrap_or_default();
            OfferResponse::new(o, ids)
        })
        .collect();

    Ok(Json(Paginated::new(data, total, query.offset, limit)))
}

/// `GET /offers/{id}`: Visible to the offerer and the publication owner.
async fn get_offer(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OfferResponse>, AppError> {
    let offer = lookup::find_offer(&state.db, id).await?;
    let publication = lookup::find_publication(&state.db, offer.publication_id).await?;

    if offer.user_id != actor.id && publication.owner_id != actor.id && !actor.is_admin() {
        return Err(AppError::Forbidden(
            "You are not a party to this offer".to_string(),
        ));
    }

    let card_ids = lookup::offer_card_ids(&state.db, offer.id).await?;
    Ok(Json(OfferResponse::new(offer, card_ids)))
}

/// `PATCH /offers/{id}`: Accept, reject, or cancel a pending offer.
async fn update_offer_status(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateOfferStatusRequest>,
) -> Result<Json<OfferResponse>, AppError> {
    let next = parse_status(&req.status_offer)?;
    if next == OfferStatus::Pending {
        return Err(AppError::Conflict(
            "An offer cannot be moved back to PENDING".to_string(),
        ));
    }

    let offer = lookup::find_offer(&state.db, id).await?;
    let publication = lookup::find_publication(&state.db, offer.publication_id).await?;
    ensure_may_set(&actor, &offer, &publication, next)?;

    let offer = TradeService::change_offer_status(&state.db, &offer, next).await?;
    let card_ids = lookup::offer_card_ids(&state.db, offer.id).await?;

    Ok(Json(OfferResponse::new(offer, card_ids)))
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_status(raw: &str) -> Result<OfferStatus, AppError> {
    OfferStatus::from_str(raw).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Unknown status '{raw}', expected PENDING, ACCEPTED, REJECTED or CANCELED"
        ))
    })
}

/// Accept/reject belong to the publication owner, cancel to the offerer.
fn ensure_may_set(
    actor: &user::Model,
    offer: &offer::Model,
    publication: &publication::Model,
    next: OfferStatus,
) -> Result<(), AppError> {
    let allowed = match next {
        OfferStatus::Accepted | OfferStatus::Rejected => publication.owner_id == actor.id,
        OfferStatus::Canceled => offer.user_id == actor.id,
        OfferStatus::Pending => false,
    };
    if !allowed {
        return Err(AppError::Forbidden(format!(
            "You are not allowed to mark this offer {next}"
        )));
    }
    Ok(())
}

/// Every proposed card must exist and belong to the offerer.
async fn ensure_cards_owned(
    state: &AppState,
    card_ids: &[Uuid],
    offerer_id: Uuid,
) -> Result<(), AppError> {
    if card_ids.is_empty() {
        return Ok(());
    }

    let cards = card::Entity::find()
        .filter(card::Column::Id.is_in(card_ids.to_vec()))
        .all(&state.db)
        .await?;

    if cards.len() != card_ids.len() {
        return Err(AppError::BadRequest(
            "One or more card IDs do not exist".to_string(),
        ));
    }
    if cards.iter().any(|c| c.owner_id != offerer_id) {
        return Err(AppError::Forbidden(
            "You can only offer cards you own".to_string(),
        ));
    }
    Ok(())
}

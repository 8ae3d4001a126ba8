use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::pagination::{clamp_limit, default_limit, default_offset};
use crate::dto::{OfferResponse, Paginated};
use crate::entities::{
    PublicationStatus, card, card_base, offer, publication, publication_card_base, user,
};
use crate::error::AppError;
use crate::extractors::{ValidatedJson, required_text};
use crate::services::{TradeService, lookup};
use crate::state::AppState;

/// Publication router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_publications).post(create_publication))
        .route(
            "/{id}",
            get(get_publication)
                .put(update_publication)
                .delete(delete_publication),
        )
        .route("/{id}/cancel", post(cancel_publication))
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreatePublicationRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    name: String,
    card_id: Uuid,
    #[validate(range(min = 0.0, message = "valueMoney must not be negative"))]
    value_money: Option<f64>,
    #[serde(default)]
    card_exchange_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdatePublicationRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    name: Option<String>,
    #[validate(range(min = 0.0, message = "valueMoney must not be negative"))]
    value_money: Option<f64>,
    card_exchange_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicationListQuery {
    #[serde(default = "default_offset")]
    offset: u64,
    #[serde(default = "default_limit")]
    limit: u64,
    owner_id: Option<Uuid>,
    status: Option<String>,
    game_id: Option<Uuid>,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicationResponse {
    id: Uuid,
    name: String,
    card_id: Uuid,
    owner_id: Uuid,
    value_money: Option<f64>,
    /// Card bases the owner would take in exchange.
    card_exchange_ids: Vec<Uuid>,
    status_publication: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    offers: Option<Vec<OfferResponse>>,
    created_at: String,
    updated_at: String,
}

impl PublicationResponse {
    fn new(p: publication::Model, card_exchange_ids: Vec<Uuid>) -> Self {
        Self {
            id: p.id,
            name: p.name,
            card_id: p.card_id,
            owner_id: p.owner_id,
            value_money: p.value_money,
            card_exchange_ids,
            status_publication: p.status,
            offers: None,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /publications`: List an owned card for trade or sale.
async fn create_publication(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ValidatedJson(req): ValidatedJson<CreatePublicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = required_text(&req.name, "name")?;
    let wanted = lookup::dedup_ids(req.card_exchange_ids);
    ensure_asks_something(req.value_money, &wanted)?;

    let card = lookup::find_card(&state.db, req.card_id).await?;
    if card.owner_id != owner.id {
        return Err(AppError::Forbidden("You do not own this card".to_string()));
    }
    if TradeService::card_is_listed(&state.db, card.id).await? {
        return Err(AppError::Conflict(
            "Card already has an open publication".to_string(),
        ));
    }
    lookup::ensure_card_bases_exist(&state.db, &wanted).await?;

    let now = Utc::now().fixed_offset();
    let txn = state.db.begin().await?;

    let publication = publication::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        card_id: Set(card.id),
        owner_id: Set(owner.id),
        value_money: Set(req.value_money),
        status: Set(PublicationStatus::Open.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::conflict_on_duplicate(e, "Card already has an open publication"))?;
    replace_wanted_card_bases(&txn, publication.id, &wanted).await?;

    txn.commit().await?;

    tracing::info!(
        publication_id = %publication.id,
        card_id = %card.id,
        owner_id = %owner.id,
        "Publication created"
    );

    Ok((
        StatusCode::CREATED,
        Json(PublicationResponse::new(publication, wanted)),
    ))
}

/// `GET /publications`: Browse publications.
async fn list_publications(
    State(state): State<AppState>,
    Query(query): Query<PublicationListQuery>,
) -> Result<Json<Paginated<PublicationResponse>>, AppError> {
    let limit = clamp_limit(query.limit);

    let mut select = publication::Entity::find();
    if let Some(owner_id) = query.owner_id {
        select = select.filter(publication::Column::OwnerId.eq(owner_id));
    }
    if let Some(raw) = query.status.as_deref() {
        let status = PublicationStatus::from_str(raw).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Unknown status '{raw}', expected OPEN, CLOSED or CANCELED"
            ))
        })?;
        select = select.filter(publication::Column::Status.eq(status.as_str()));
    }
    if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        select = select.filter(publication::Column::Name.contains(name));
    }
    if let Some(game_id) = query.game_id {
        select = select
            .join(JoinType::InnerJoin, publication::Relation::Card.def())
            .join(JoinType::InnerJoin, card::Relation::CardBase.def())
            .filter(card_base::Column::GameId.eq(game_id));
    }

    let total = select.clone().count(&state.db).await?;
    let publications = select
        .order_by_desc(publication::Column::CreatedAt)
        .offset(query.offset)
        .limit(limit)
        .all(&state.db)
        .await?;

    let mut wanted = lookup::wanted_card_base_ids_many(
        &state.db,
        publications.iter().map(|p| p.id).collect(),
    )
    .await?;

    let data = publications
        .into_iter()
        .map(|p| {
            let ids = wanted.remove(&p.id).unwrap_or_default();
            PublicationResponse::new(p, ids)
        })
        .collect();

    Ok(Json(Paginated::new(data, total, query.offset, limit)))
}

/// `GET /publications/{id}`: Publication with its wanted card bases and offers.
async fn get_publication(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicationResponse>, AppError> {
    let publication = lookup::find_publication(&state.db, id).await?;
    let wanted = lookup::wanted_card_base_ids(&state.db, id).await?;

    let offers = offer::Entity::find()
        .filter(offer::Column::PublicationId.eq(id))
        .order_by_asc(offer::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let mut offered_cards =
        lookup::offer_card_ids_many(&state.db, offers.iter().map(|o| o.id).collect()).await?;

    let mut response = PublicationResponse::new(publication, wanted);
    response.offers = Some(
        offers
            .into_iter()
            .map(|o| {
                let ids = offered_cards.remove(&o.id).unwrap_or_default();
                OfferResponse::new(o, ids)
            })
            .collect(),
    );

    Ok(Json(response))
}

/// `PUT /publications/{id}`: Owner edits an open publication.
async fn update_publication(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdatePublicationRequest>,
) -> Result<Json<PublicationResponse>, AppError> {
    let name = req
        .name
        .as_deref()
        .map(|n| required_text(n, "name"))
        .transpose()?;
    let publication = lookup::find_publication(&state.db, id).await?;
    ensure_owner(&publication, &actor)?;
    ensure_open(&publication)?;

    let wanted = match req.card_exchange_ids {
        Some(ids) => {
            let ids = lookup::dedup_ids(ids);
            lookup::ensure_card_bases_exist(&state.db, &ids).await?;
            Some(ids)
        }
        None => None,
    };
    let current_wanted = match &wanted {
        Some(ids) => ids.clone(),
        None => lookup::wanted_card_base_ids(&state.db, id).await?,
    };
    ensure_asks_something(req.value_money.or(publication.value_money), &current_wanted)?;

    let txn = state.db.begin().await?;

    let mut active: publication::ActiveModel = publication.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(value_money) = req.value_money {
        active.value_money = Set(Some(value_money));
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    let publication = active.update(&txn).await?;

    if let Some(ids) = &wanted {
        replace_wanted_card_bases(&txn, id, ids).await?;
    }
    txn.commit().await?;

    Ok(Json(PublicationResponse::new(publication, current_wanted)))
}

/// `POST /publications/{id}/cancel`: Owner withdraws an open publication.
async fn cancel_publication(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicationResponse>, AppError> {
    let publication = lookup::find_publication(&state.db, id).await?;
    ensure_owner(&publication, &actor)?;

    let publication = TradeService::cancel_publication(&state.db, publication.id).await?;
    let wanted = lookup::wanted_card_base_ids(&state.db, id).await?;

    Ok(Json(PublicationResponse::new(publication, wanted)))
}

/// `DELETE /publications/{id}`: Owner or admin removes a publication and its offers.
async fn delete_publication(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let publication = lookup::find_publication(&state.db, id).await?;
    if publication.owner_id != actor.id && !actor.is_admin() {
        return Err(AppError::Forbidden(
            "You are not allowed to delete this publication".to_string(),
        ));
    }

    TradeService::delete_publication(&state.db, publication.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helpers
// ============================================================================

fn ensure_owner(publication: &publication::Model, actor: &user::Model) -> Result<(), AppError> {
    if publication.owner_id != actor.id {
        return Err(AppError::Forbidden(
            "You do not own this publication".to_string(),
        ));
    }
    Ok(())
}

fn ensure_open(publication: &publication::Model) -> Result<(), AppError> {
    let open = PublicationStatus::from_str(&publication.status).is_some_and(|s| s.is_open());
    if !open {
        return Err(AppError::Conflict(format!(
            "Publication is {} and can no longer be modified",
            publication.status
        )));
    }
    Ok(())
}

/// A publication must ask for money, card bases, or both.
fn ensure_asks_something(value_money: Option<f64>, wanted: &[Uuid]) -> Result<(), AppError> {
    if value_money.is_none() && wanted.is_empty() {
        return Err(AppError::BadRequest(
            "Provide valueMoney, cardExchangeIds, or both".to_string(),
        ));
    }
    Ok(())
}

async fn replace_wanted_card_bases<C: ConnectionTrait>(
    conn: &C,
    publication_id: Uuid,
    card_base_ids: &[Uuid],
) -> Result<(), AppError> {
    publication_card_base::Entity::delete_many()
        .filter(publication_card_base::Column::PublicationId.eq(publication_id))
        .exec(conn)
        .await?;

    if card_base_ids.is_empty() {
        return Ok(());
    }

    let rows = card_base_ids
        .iter()
        .map(|card_base_id| publication_card_base::ActiveModel {
            publication_id: Set(publication_id),
            card_base_id: Set(*card_base_id),
        });
    publication_card_base::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

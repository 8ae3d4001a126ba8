//! Single-row lookups shared by the route handlers.
//!
//! Each helper is generic over [`ConnectionTrait`] so it can run on the pool or
//! inside a transaction, and maps a missing row to a stable 404 message.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{
    card, card_base, game, offer, offer_card, publication, publication_card_base, user,
};
use crate::error::AppError;

/// Fetch a user that has not been soft-deleted.
///
/// # Errors
///
/// `NotFound` if the user does not exist or was deleted.
pub async fn find_active_user<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .filter(user::Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// # Errors
///
/// `NotFound` with `"Game not found"`.
pub async fn find_game<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<game::Model, AppError> {
    game::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))
}

/// # Errors
///
/// `NotFound` with `"CardBase not found"`.
pub async fn find_card_base<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<card_base::Model, AppError> {
    card_base::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("CardBase not found".to_string()))
}

/// # Errors
///
/// `NotFound` with `"Card not found"`.
pub async fn find_card<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<card::Model, AppError> {
    card::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Card not found".to_string()))
}

/// # Errors
///
/// `NotFound` with `"Publication not found"`.
pub async fn find_publication<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<publication::Model, AppError> {
    publication::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Publication not found".to_string()))
}

/// # Errors
///
/// `NotFound` with `"Offer not found"`.
pub async fn find_offer<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<offer::Model, AppError> {
    offer::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Offer not found".to_string()))
}

/// Ids of the card bases a publication asks for in exchange.
///
/// # Errors
///
/// Returns [`AppError`] if the database query fails.
pub async fn wanted_card_base_ids<C: ConnectionTrait>(
    conn: &C,
    publication_id: Uuid,
) -> Result<Vec<Uuid>, AppError> {
    let rows = publication_card_base::Entity::find()
        .filter(publication_card_base::Column::PublicationId.eq(publication_id))
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|r| r.card_base_id).collect())
}

/// Wanted card base ids for several publications at once, keyed by publication id.
///
/// # Errors
///
/// Returns [`AppError`] if the database query fails.
pub async fn wanted_card_base_ids_many<C: ConnectionTrait>(
    conn: &C,
    publication_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<Uuid>>, AppError> {
    if publication_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = publication_card_base::Entity::find()
        .filter(publication_card_base::Column::PublicationId.is_in(publication_ids))
        .all(conn)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.publication_id)
            .or_default()
            .push(row.card_base_id);
    }
    Ok(grouped)
}

/// Ids of the cards proposed in an offer.
///
/// # Errors
///
/// Returns [`AppError`] if the database query fails.
pub async fn offer_card_ids<C: ConnectionTrait>(
    conn: &C,
    offer_id: Uuid,
) -> Result<Vec<Uuid>, AppError> {
    let rows = offer_card::Entity::find()
        .filter(offer_card::Column::OfferId.eq(offer_id))
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|r| r.card_id).collect())
}

/// Proposed card ids for several offers at once, keyed by offer id.
///
/// # Errors
///
/// Returns [`AppError`] if the database query fails.
pub async fn offer_card_ids_many<C: ConnectionTrait>(
    conn: &C,
    offer_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<Uuid>>, AppError> {
    if offer_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = offer_card::Entity::find()
        .filter(offer_card::Column::OfferId.is_in(offer_ids))
        .all(conn)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in rows {
        grouped.entry(row.offer_id).or_default().push(row.card_id);
    }
    Ok(grouped)
}

/// Check that every id names an existing card base.
///
/// # Errors
///
/// `BadRequest` if any id is unknown.
pub async fn ensure_card_bases_exist<C: ConnectionTrait>(
    conn: &C,
    ids: &[Uuid],
) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }

    let found = card_base::Entity::find()
        .filter(card_base::Column::Id.is_in(ids.to_vec()))
        .count(conn)
        .await?;

    if usize::try_from(found).unwrap_or(usize::MAX) != ids.len() {
        return Err(AppError::BadRequest(
            "One or more card base IDs do not exist".to_string(),
        ));
    }
    Ok(())
}

/// Remove duplicate ids while keeping the first occurrence order.
#[must_use]
pub fn dedup_ids(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

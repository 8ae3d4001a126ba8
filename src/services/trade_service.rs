use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{
    OfferStatus, PublicationStatus, card, offer, offer_card, publication, publication_card_base,
    refresh_token, user,
};
use crate::error::AppError;
use crate::services::lookup;

/// Publication and offer state changes.
///
/// Every status write is a conditional `UPDATE ... WHERE status = <expected>`;
/// an update that touches no row means a concurrent request already moved the
/// record, and the caller gets a 409.
pub struct TradeService;

impl TradeService {
    /// Whether the card currently backs an `OPEN` publication.
    pub async fn card_is_listed<C: ConnectionTrait>(
        conn: &C,
        card_id: Uuid,
    ) -> Result<bool, AppError> {
        let open = publication::Entity::find()
            .filter(publication::Column::CardId.eq(card_id))
            .filter(publication::Column::Status.eq(PublicationStatus::Open.as_str()))
            .count(conn)
            .await?;
        Ok(open > 0)
    }

    /// Whether the card is proposed in any `PENDING` offer.
    pub async fn card_in_pending_offer<C: ConnectionTrait>(
        conn: &C,
        card_id: Uuid,
    ) -> Result<bool, AppError> {
        let pending = offer_card::Entity::find()
            .inner_join(offer::Entity)
            .filter(offer_card::Column::CardId.eq(card_id))
            .filter(offer::Column::Status.eq(OfferStatus::Pending.as_str()))
            .count(conn)
            .await?;
        Ok(pending > 0)
    }

    /// Whether the user already has a `PENDING` offer on the publication.
    pub async fn has_pending_offer<C: ConnectionTrait>(
        conn: &C,
        publication_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let pending = offer::Entity::find()
            .filter(offer::Column::PublicationId.eq(publication_id))
            .filter(offer::Column::UserId.eq(user_id))
            .filter(offer::Column::Status.eq(OfferStatus::Pending.as_str()))
            .count(conn)
            .await?;
        Ok(pending > 0)
    }

    /// Whether the card was traded: it backs a `CLOSED` publication or is part
    /// of an `ACCEPTED` offer.
    pub async fn card_has_completed_trade<C: ConnectionTrait>(
        conn: &C,
        card_id: Uuid,
    ) -> Result<bool, AppError> {
        let closed = publication::Entity::find()
            .filter(publication::Column::CardId.eq(card_id))
            .filter(publication::Column::Status.eq(PublicationStatus::Closed.as_str()))
            .count(conn)
            .await?;
        if closed > 0 {
            return Ok(true);
        }

        let accepted = offer_card::Entity::find()
            .inner_join(offer::Entity)
            .filter(offer_card::Column::CardId.eq(card_id))
            .filter(offer::Column::Status.eq(OfferStatus::Accepted.as_str()))
            .count(conn)
            .await?;
        Ok(accepted > 0)
    }

    /// Row-lock an `OPEN` publication for the rest of the transaction.
    ///
    /// The write is a no-op on the row, but it conflicts with a concurrent
    /// accept or cancel on the same publication.
    ///
    /// # Errors
    ///
    /// `Conflict` if the publication is no longer `OPEN`.
    pub async fn lock_open_publication<C: ConnectionTrait>(
        conn: &C,
        publication_id: Uuid,
    ) -> Result<(), AppError> {
        let open = PublicationStatus::Open.as_str();
        let result = publication::Entity::update_many()
            .col_expr(publication::Column::Status, Expr::value(open))
            .filter(publication::Column::Id.eq(publication_id))
            .filter(publication::Column::Status.eq(open))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Publication is not open for offers".to_string(),
            ));
        }
        Ok(())
    }

    /// Move an offer out of `PENDING`.
    ///
    /// Accepting also closes the publication and rejects the other pending
    /// offers on it, all in one transaction.
    ///
    /// # Errors
    ///
    /// `Conflict` if the transition is not legal, the offer was already
    /// decided, or the publication is no longer open.
    pub async fn change_offer_status(
        db: &DatabaseConnection,
        current: &offer::Model,
        next: OfferStatus,
    ) -> Result<offer::Model, AppError> {
        let status = OfferStatus::from_str(&current.status).unwrap_or_default();
        if status.is_terminal() {
            return Err(AppError::Conflict(format!("Offer is already {status}")));
        }
        if !status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Offer cannot move from {status} to {next}"
            )));
        }

        if next == OfferStatus::Accepted {
            Self::accept_offer(db, current).await?;
        } else {
            Self::transition_offer(db, current.id, OfferStatus::Pending, next).await?;
        }

        tracing::info!(offer_id = %current.id, status = %next, "Offer status changed");

        lookup::find_offer(db, current.id).await
    }

    async fn accept_offer(db: &DatabaseConnection, accepted: &offer::Model) -> Result<(), AppError> {
        let txn = db.begin().await?;

        Self::transition_offer(&txn, accepted.id, OfferStatus::Pending, OfferStatus::Accepted)
            .await?;

        let closed = Self::transition_publication(
            &txn,
            accepted.publication_id,
            PublicationStatus::Open,
            PublicationStatus::Closed,
        )
        .await?;
        if !closed {
            return Err(AppError::Conflict(
                "Publication is no longer open".to_string(),
            ));
        }

        let rejected = offer::Entity::update_many()
            .col_expr(
                offer::Column::Status,
                Expr::value(OfferStatus::Rejected.as_str()),
            )
            .col_expr(offer::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(offer::Column::PublicationId.eq(accepted.publication_id))
            .filter(offer::Column::Id.ne(accepted.id))
            .filter(offer::Column::Status.eq(OfferStatus::Pending.as_str()))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        tracing::info!(
            offer_id = %accepted.id,
            publication_id = %accepted.publication_id,
            rejected = rejected.rows_affected,
            "Publication closed by accepted offer"
        );
        Ok(())
    }

    /// Guarded single-offer status update.
    async fn transition_offer<C: ConnectionTrait>(
        conn: &C,
        offer_id: Uuid,
        from: OfferStatus,
        to: OfferStatus,
    ) -> Result<(), AppError> {
        let result = offer::Entity::update_many()
            .col_expr(offer::Column::Status, Expr::value(to.as_str()))
            .col_expr(offer::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(offer::Column::Id.eq(offer_id))
            .filter(offer::Column::Status.eq(from.as_str()))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Offer was already decided by another request".to_string(),
            ));
        }
        Ok(())
    }

    /// Guarded publication status update. Returns `false` when no row matched.
    async fn transition_publication<C: ConnectionTrait>(
        conn: &C,
        publication_id: Uuid,
        from: PublicationStatus,
        to: PublicationStatus,
    ) -> Result<bool, AppError> {
        if !from.can_transition_to(to) {
            return Ok(false);
        }
        let result = publication::Entity::update_many()
            .col_expr(publication::Column::Status, Expr::value(to.as_str()))
            .col_expr(
                publication::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(publication::Column::Id.eq(publication_id))
            .filter(publication::Column::Status.eq(from.as_str()))
            .exec(conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Cancel every pending offer on a publication. Returns how many changed.
    async fn cancel_pending_offers<C: ConnectionTrait>(
        conn: &C,
        publication_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = offer::Entity::update_many()
            .col_expr(
                offer::Column::Status,
                Expr::value(OfferStatus::Canceled.as_str()),
            )
            .col_expr(offer::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(offer::Column::PublicationId.eq(publication_id))
            .filter(offer::Column::Status.eq(OfferStatus::Pending.as_str()))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Withdraw an open publication and cancel its pending offers.
    ///
    /// # Errors
    ///
    /// `Conflict` if the publication is not `OPEN`.
    pub async fn cancel_publication(
        db: &DatabaseConnection,
        publication_id: Uuid,
    ) -> Result<publication::Model, AppError> {
        let txn = db.begin().await?;

        let canceled = Self::transition_publication(
            &txn,
            publication_id,
            PublicationStatus::Open,
            PublicationStatus::Canceled,
        )
        .await?;
        if !canceled {
            return Err(AppError::Conflict(
                "Only open publications can be canceled".to_string(),
            ));
        }

        let offers = Self::cancel_pending_offers(&txn, publication_id).await?;
        txn.commit().await?;

        tracing::info!(%publication_id, canceled_offers = offers, "Publication canceled");

        lookup::find_publication(db, publication_id).await
    }

    /// Hard-delete a publication together with its wanted card bases and offers.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if a database write fails.
    pub async fn delete_publication(
        db: &DatabaseConnection,
        publication_id: Uuid,
    ) -> Result<(), AppError> {
        let txn = db.begin().await?;
        Self::purge_publication(&txn, publication_id).await?;
        txn.commit().await?;

        tracing::info!(%publication_id, "Publication deleted");
        Ok(())
    }

    /// Delete an untraded card along with its canceled publications.
    ///
    /// The caller has already ruled out open listings, pending offers and
    /// completed trades.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if a database write fails.
    pub async fn delete_card(db: &DatabaseConnection, card_id: Uuid) -> Result<(), AppError> {
        let txn = db.begin().await?;

        let canceled: Vec<Uuid> = publication::Entity::find()
            .select_only()
            .column(publication::Column::Id)
            .filter(publication::Column::CardId.eq(card_id))
            .filter(publication::Column::Status.eq(PublicationStatus::Canceled.as_str()))
            .into_tuple()
            .all(&txn)
            .await?;
        for publication_id in &canceled {
            Self::purge_publication(&txn, *publication_id).await?;
        }

        card::Entity::delete_by_id(card_id).exec(&txn).await?;
        txn.commit().await?;

        tracing::info!(%card_id, canceled_publications = canceled.len(), "Card deleted");
        Ok(())
    }

    async fn purge_publication<C: ConnectionTrait>(
        conn: &C,
        publication_id: Uuid,
    ) -> Result<(), AppError> {
        let offer_ids: Vec<Uuid> = offer::Entity::find()
            .select_only()
            .column(offer::Column::Id)
            .filter(offer::Column::PublicationId.eq(publication_id))
            .into_tuple()
            .all(conn)
            .await?;

        if !offer_ids.is_empty() {
            offer_card::Entity::delete_many()
                .filter(offer_card::Column::OfferId.is_in(offer_ids))
                .exec(conn)
                .await?;
        }
        offer::Entity::delete_many()
            .filter(offer::Column::PublicationId.eq(publication_id))
            .exec(conn)
            .await?;
        publication_card_base::Entity::delete_many()
            .filter(publication_card_base::Column::PublicationId.eq(publication_id))
            .exec(conn)
            .await?;
        publication::Entity::delete_by_id(publication_id)
            .exec(conn)
            .await?;
        Ok(())
    }

    /// Soft-delete an account.
    ///
    /// Revokes its refresh tokens, cancels its open publications along with
    /// their pending offers, and withdraws its own pending offers.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if a database write fails.
    pub async fn deactivate_user(
        db: &DatabaseConnection,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        let now = Utc::now().fixed_offset();
        let txn = db.begin().await?;

        user::Entity::update_many()
            .col_expr(user::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(user_id))
            .exec(&txn)
            .await?;

        refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::RevokedAt, Expr::value(Some(now)))
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(&txn)
            .await?;

        let open_publications: Vec<Uuid> = publication::Entity::find()
            .select_only()
            .column(publication::Column::Id)
            .filter(publication::Column::OwnerId.eq(user_id))
            .filter(publication::Column::Status.eq(PublicationStatus::Open.as_str()))
            .into_tuple()
            .all(&txn)
            .await?;

        for publication_id in &open_publications {
            Self::transition_publication(
                &txn,
                *publication_id,
                PublicationStatus::Open,
                PublicationStatus::Canceled,
            )
            .await?;
            Self::cancel_pending_offers(&txn, *publication_id).await?;
        }

        offer::Entity::update_many()
            .col_expr(
                offer::Column::Status,
                Expr::value(OfferStatus::Canceled.as_str()),
            )
            .col_expr(offer::Column::UpdatedAt, Expr::value(now))
            .filter(offer::Column::UserId.eq(user_id))
            .filter(offer::Column::Status.eq(OfferStatus::Pending.as_str()))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        tracing::info!(
            %user_id,
            canceled_publications = open_publications.len(),
            "User deactivated"
        );
        Ok(())
    }
}

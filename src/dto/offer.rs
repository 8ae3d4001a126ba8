use serde::Serialize;
use uuid::Uuid;

use crate::entities::offer;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferResponse {
    pub id: Uuid,
    pub publication_id: Uuid,
    pub user_id: Uuid,
    pub money_offer: Option<f64>,
    /// Ids of the offerer's cards proposed in exchange.
    pub card_exchange_ids: Vec<Uuid>,
    pub status_offer: String,
    pub created_at: String,
    pub updated_at: String,
}

impl OfferResponse {
    #[must_use]
    pub fn new(offer: offer::Model, card_exchange_ids: Vec<Uuid>) -> Self {
        Self {
            id: offer.id,
            publication_id: offer.publication_id,
            user_id: offer.user_id,
            money_offer: offer.money_offer,
            card_exchange_ids,
            status_offer: offer.status,
            created_at: offer.created_at.to_rfc3339(),
            updated_at: offer.updated_at.to_rfc3339(),
        }
    }
}

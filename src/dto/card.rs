use serde::Serialize;
use uuid::Uuid;

use crate::entities::{card, card_base};

/// The card base a card is an instance of, embedded in card responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardBaseSummary {
    pub id: Uuid,
    pub game_id: Uuid,
    pub name_card: String,
}

impl From<&card_base::Model> for CardBaseSummary {
    fn from(base: &card_base::Model) -> Self {
        Self {
            id: base.id,
            game_id: base.game_id,
            name_card: base.name_card.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub id: Uuid,
    pub card_base_id: Uuid,
    pub owner_id: Uuid,
    pub status_card: i32,
    pub url_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_base: Option<CardBaseSummary>,
    pub created_at: String,
    pub updated_at: String,
}

impl CardResponse {
    #[must_use]
    pub fn new(card: card::Model, base: Option<&card_base::Model>) -> Self {
        Self {
            id: card.id,
            card_base_id: card.card_base_id,
            owner_id: card.owner_id,
            status_card: card.status_card,
            url_image: card.url_image,
            card_base: base.map(CardBaseSummary::from),
            created_at: card.created_at.to_rfc3339(),
            updated_at: card.updated_at.to_rfc3339(),
        }
    }
}

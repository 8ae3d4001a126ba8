use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user-owned instance of a card base.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "card")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub card_base_id: Uuid,
    pub owner_id: Uuid,
    /// Condition grade, 1 (damaged) to 10 (mint).
    pub status_card: i32,
    pub url_image: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::card_base::Entity",
        from = "Column::CardBaseId",
        to = "super::card_base::Column::Id"
    )]
    CardBase,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    #[sea_orm(has_many = "super::publication::Entity")]
    Publications,
    #[sea_orm(has_many = "super::offer_card::Entity")]
    OfferCards,
}

impl Related<super::card_base::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CardBase.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::publication::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Publications.def()
    }
}

impl Related<super::offer_card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OfferCards.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

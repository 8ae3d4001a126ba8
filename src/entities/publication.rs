use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "publication")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub card_id: Uuid,
    pub owner_id: Uuid,
    pub value_money: Option<f64>,
    /// See [`super::PublicationStatus`].
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::card::Entity",
        from = "Column::CardId",
        to = "super::card::Column::Id"
    )]
    Card,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    #[sea_orm(has_many = "super::offer::Entity")]
    Offers,
    #[sea_orm(has_many = "super::publication_card_base::Entity")]
    WantedCardBases,
}

impl Related<super::card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Card.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::offer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offers.def()
    }
}

impl Related<super::publication_card_base::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WantedCardBases.def()
    }
}

impl Related<super::card_base::Entity> for Entity {
    fn to() -> RelationDef {
        super::publication_card_base::Relation::CardBase.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::publication_card_base::Relation::Publication.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

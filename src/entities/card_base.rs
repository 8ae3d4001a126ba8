use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A card template within a game, e.g. "Pikachu" in "Pokémon TCG".
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "card_base")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub game_id: Uuid,
    pub name_card: String,
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::game::Entity",
        from = "Column::GameId",
        to = "super::game::Column::Id"
    )]
    Game,
    #[sea_orm(has_many = "super::card::Entity")]
    Cards,
    #[sea_orm(has_many = "super::publication_card_base::Entity")]
    PublicationCardBases,
}

impl Related<super::game::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Game.def()
    }
}

impl Related<super::card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cards.def()
    }
}

impl Related<super::publication_card_base::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PublicationCardBases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

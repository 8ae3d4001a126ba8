use sea_orm::entity::prelude::*;

/// A card base the publication owner would accept in exchange.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "publication_card_base")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub publication_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub card_base_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::publication::Entity",
        from = "Column::PublicationId",
        to = "super::publication::Column::Id",
        on_delete = "Cascade"
    )]
    Publication,
    #[sea_orm(
        belongs_to = "super::card_base::Entity",
        from = "Column::CardBaseId",
        to = "super::card_base::Column::Id",
        on_delete = "Cascade"
    )]
    CardBase,
}

impl Related<super::publication::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Publication.def()
    }
}

impl Related<super::card_base::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CardBase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm_migration::prelude::*;

/// Join table: the offerer's cards proposed in an offer.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OfferCard::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(OfferCard::OfferId).uuid().not_null())
                    .col(ColumnDef::new(OfferCard::CardId).uuid().not_null())
                    .primary_key(Index::create().col(OfferCard::OfferId).col(OfferCard::CardId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offer_card_offer_id")
                            .from(OfferCard::Table, OfferCard::OfferId)
                            .to(Offer::Table, Offer::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offer_card_card_id")
                            .from(OfferCard::Table, OfferCard::CardId)
                            .to(Card::Table, Card::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Reverse lookup: "is this card proposed anywhere?"
        manager
            .create_index(
                Index::create()
                    .name("idx_offer_card_card_id")
                    .table(OfferCard::Table)
                    .col(OfferCard::CardId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OfferCard::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OfferCard {
    Table,
    OfferId,
    CardId,
}

#[derive(DeriveIden)]
enum Offer {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Card {
    Table,
    Id,
}

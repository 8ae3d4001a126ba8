use sea_orm_migration::prelude::*;

/// Creates the `card` table: user-owned instances of a card base.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Card {
    Table,
    Id,
    CardBaseId,
    OwnerId,
    StatusCard,
    UrlImage,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CardBase {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Card::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Card::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Card::CardBaseId).uuid().not_null())
                    .col(ColumnDef::new(Card::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Card::StatusCard).integer().not_null())
                    .col(ColumnDef::new(Card::UrlImage).string_len(500).null())
                    .col(
                        ColumnDef::new(Card::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Card::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_card_card_base_id")
                            .from(Card::Table, Card::CardBaseId)
                            .to(CardBase::Table, CardBase::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_card_owner_id")
                            .from(Card::Table, Card::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_card_owner_id")
                    .table(Card::Table)
                    .col(Card::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Card::Table).to_owned())
            .await
    }
}

use sea_orm_migration::prelude::*;

/// Creates the `publication` table: listings of a card for trade or sale.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Publication {
    Table,
    Id,
    Name,
    CardId,
    OwnerId,
    ValueMoney,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Card {
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
                    .table(Publication::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Publication::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Publication::Name).string_len(150).not_null())
                    .col(ColumnDef::new(Publication::CardId).uuid().not_null())
                    .col(ColumnDef::new(Publication::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Publication::ValueMoney).double().null())
                    .col(
                        ColumnDef::new(Publication::Status)
                            .string_len(20)
                            .not_null()
                            .default("OPEN"),
                    )
                    .col(
                        ColumnDef::new(Publication::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Publication::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_publication_card_id")
                            .from(Publication::Table, Publication::CardId)
                            .to(Card::Table, Card::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_publication_owner_id")
                            .from(Publication::Table, Publication::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_publication_status")
                    .table(Publication::Table)
                    .col(Publication::Status)
                    .to_owned(),
            )
            .await?;

        // A card backs at most one OPEN publication.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_publication_open_card \
                 ON publication (card_id) WHERE status = 'OPEN'",
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Publication::Table).to_owned())
            .await
    }
}

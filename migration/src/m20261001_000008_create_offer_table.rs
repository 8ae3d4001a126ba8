use sea_orm_migration::prelude::*;

/// Creates the `offer` table: proposals made against a publication.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Offer {
    Table,
    Id,
    PublicationId,
    UserId,
    MoneyOffer,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Publication {
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
                    .table(Offer::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Offer::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Offer::PublicationId).uuid().not_null())
                    .col(ColumnDef::new(Offer::UserId).uuid().not_null())
                    .col(ColumnDef::new(Offer::MoneyOffer).double().null())
                    .col(
                        ColumnDef::new(Offer::Status)
                            .string_len(20)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Offer::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Offer::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offer_publication_id")
                            .from(Offer::Table, Offer::PublicationId)
                            .to(Publication::Table, Publication::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offer_user_id")
                            .from(Offer::Table, Offer::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_offer_publication_id_status")
                    .table(Offer::Table)
                    .col(Offer::PublicationId)
                    .col(Offer::Status)
                    .to_owned(),
            )
            .await?;

        // One PENDING offer per user and publication; decided offers may repeat.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_offer_pending_per_user \
                 ON offer (publication_id, user_id) WHERE status = 'PENDING'",
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Offer::Table).to_owned())
            .await
    }
}

use sea_orm_migration::prelude::*;

/// Creates the `card_base` table: card templates belonging to a game.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum CardBase {
    Table,
    Id,
    GameId,
    NameCard,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Game {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CardBase::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CardBase::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CardBase::GameId).uuid().not_null())
                    .col(ColumnDef::new(CardBase::NameCard).string_len(150).not_null())
                    .col(ColumnDef::new(CardBase::Description).string_len(1000).null())
                    .col(
                        ColumnDef::new(CardBase::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CardBase::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_card_base_game_id")
                            .from(CardBase::Table, CardBase::GameId)
                            .to(Game::Table, Game::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_card_base_game_id_name_card")
                    .table(CardBase::Table)
                    .col(CardBase::GameId)
                    .col(CardBase::NameCard)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CardBase::Table).to_owned())
            .await
    }
}

use sea_orm_migration::prelude::*;

/// Join table: card bases a publication owner would accept in exchange.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PublicationCardBase::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PublicationCardBase::PublicationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PublicationCardBase::CardBaseId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(PublicationCardBase::PublicationId)
                            .col(PublicationCardBase::CardBaseId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_publication_card_base_publication_id")
                            .from(
                                PublicationCardBase::Table,
                                PublicationCardBase::PublicationId,
                            )
                            .to(Publication::Table, Publication::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_publication_card_base_card_base_id")
                            .from(PublicationCardBase::Table, PublicationCardBase::CardBaseId)
                            .to(CardBase::Table, CardBase::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PublicationCardBase::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PublicationCardBase {
    Table,
    PublicationId,
    CardBaseId,
}

#[derive(DeriveIden)]
enum Publication {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum CardBase {
    Table,
    Id,
}

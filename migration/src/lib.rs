pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_user_table;
mod m20261001_000002_create_refresh_token_table;
mod m20261001_000003_create_game_table;
mod m20261001_000004_create_card_base_table;
mod m20261001_000005_create_card_table;
mod m20261001_000006_create_publication_table;
mod m20261001_000007_create_publication_card_base_table;
mod m20261001_000008_create_offer_table;
mod m20261001_000009_create_offer_card_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_user_table::Migration),
            Box::new(m20261001_000002_create_refresh_token_table::Migration),
            Box::new(m20261001_000003_create_game_table::Migration),
            Box::new(m20261001_000004_create_card_base_table::Migration),
            Box::new(m20261001_000005_create_card_table::Migration),
            Box::new(m20261001_000006_create_publication_table::Migration),
            Box::new(m20261001_000007_create_publication_card_base_table::Migration),
            Box::new(m20261001_000008_create_offer_table::Migration),
            Box::new(m20261001_000009_create_offer_card_table::Migration),
        ]
    }
}

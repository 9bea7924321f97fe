use crate::entities::prelude::*;
use crate::entities::{commanders, games};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Commanders)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Games)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Per-owner case-insensitive name uniqueness. The repositories check
        // before insert; this index is what makes the check race-free.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_commanders_owner_name_lower")
                    .table(Commanders)
                    .col(commanders::Column::UserId)
                    .col(commanders::Column::NameLower)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_games_owner_date")
                    .table(Games)
                    .col(games::Column::UserId)
                    .col(games::Column::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_games_commander")
                    .table(Games)
                    .col(games::Column::CommanderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Games).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Commanders).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}

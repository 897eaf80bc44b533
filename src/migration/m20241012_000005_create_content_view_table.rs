use sea_orm::Schema;
use sea_orm_migration::prelude::*;
use crate::entity::content_view::{Column, Entity};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(
                schema
                    .create_table_from_entity(Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // the view upsert conflicts on exactly these columns
        manager
            .create_index(
                Index::create()
                    .name("uq_content_views_viewer")
                    .table(Entity)
                    .col(Column::ContentType)
                    .col(Column::ObjectId)
                    .col(Column::UserId)
                    .col(Column::ViewerIp)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Entity).to_owned())
            .await
    }
}

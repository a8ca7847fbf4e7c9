//! Migration to create the pages table.
//!
//! Pages carry their own page-scoped encrypted access token and an optional
//! linked Instagram business account id. Unique per (connection, page id).

use sea_orm_migration::prelude::*;

use crate::m2025_06_01_000001_create_connections::Connections;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Pages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pages::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Pages::ConnectionId).uuid().not_null())
                    .col(ColumnDef::new(Pages::PageId).text().not_null())
                    .col(ColumnDef::new(Pages::PageName).text().null())
                    .col(ColumnDef::new(Pages::PageAccessToken).text().not_null())
                    .col(ColumnDef::new(Pages::InstagramAccountId).text().null())
                    .col(
                        ColumnDef::new(Pages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Pages::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pages_connection_id")
                            .from(Pages::Table, Pages::ConnectionId)
                            .to(Connections::Table, Connections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pages_connection_id")
                    .table(Pages::Table)
                    .col(Pages::ConnectionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_pages_connection_page")
                    .table(Pages::Table)
                    .col(Pages::ConnectionId)
                    .col(Pages::PageId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Pages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Pages {
    Table,
    Id,
    ConnectionId,
    PageId,
    PageName,
    PageAccessToken,
    InstagramAccountId,
    CreatedAt,
    UpdatedAt,
}

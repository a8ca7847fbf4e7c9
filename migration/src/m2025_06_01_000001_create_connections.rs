//! Migration to create the connections table.
//!
//! A connection is one tenant application's OAuth grant against the Meta
//! platform, carrying the encrypted long-lived user access token.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Connections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Connections::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Connections::AppId).text().not_null())
                    .col(ColumnDef::new(Connections::OrgId).text().null())
                    .col(ColumnDef::new(Connections::Label).text().null())
                    .col(ColumnDef::new(Connections::MetaUserId).text().not_null())
                    .col(ColumnDef::new(Connections::MetaUserName).text().null())
                    .col(ColumnDef::new(Connections::AccessToken).text().not_null())
                    .col(
                        ColumnDef::new(Connections::TokenExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Connections::Scopes).json_binary().null())
                    .col(
                        ColumnDef::new(Connections::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Connections::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_connections_app_id")
                    .table(Connections::Table)
                    .col(Connections::AppId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_connections_org_id")
                    .table(Connections::Table)
                    .col(Connections::OrgId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Connections::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Connections {
    Table,
    Id,
    AppId,
    OrgId,
    Label,
    MetaUserId,
    MetaUserName,
    AccessToken,
    TokenExpiresAt,
    Scopes,
    CreatedAt,
    UpdatedAt,
}

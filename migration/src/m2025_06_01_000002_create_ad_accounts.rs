//! Migration to create the ad_accounts table.
//!
//! Ad accounts are discovered under a connection during the OAuth callback and
//! refreshed on explicit sync. Unique per (connection, upstream account id).

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
                    .table(AdAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdAccounts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AdAccounts::ConnectionId).uuid().not_null())
                    .col(ColumnDef::new(AdAccounts::AdAccountId).text().not_null())
                    .col(ColumnDef::new(AdAccounts::AccountName).text().null())
                    .col(ColumnDef::new(AdAccounts::Currency).text().null())
                    .col(ColumnDef::new(AdAccounts::Timezone).text().null())
                    .col(ColumnDef::new(AdAccounts::AccountStatus).integer().null())
                    .col(
                        ColumnDef::new(AdAccounts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(AdAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AdAccounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ad_accounts_connection_id")
                            .from(AdAccounts::Table, AdAccounts::ConnectionId)
                            .to(Connections::Table, Connections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ad_accounts_connection_id")
                    .table(AdAccounts::Table)
                    .col(AdAccounts::ConnectionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ad_accounts_ad_account_id")
                    .table(AdAccounts::Table)
                    .col(AdAccounts::AdAccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_ad_accounts_connection_account")
                    .table(AdAccounts::Table)
                    .col(AdAccounts::ConnectionId)
                    .col(AdAccounts::AdAccountId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdAccounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum AdAccounts {
    Table,
    Id,
    ConnectionId,
    AdAccountId,
    AccountName,
    Currency,
    Timezone,
    AccountStatus,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

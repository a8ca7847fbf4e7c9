//! Ad account repository for database operations
//!
//! Encapsulates SeaORM operations for the ad_accounts table, including the
//! connection-scoped upsert used by discovery/sync.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::ad_account::{self, Entity as AdAccount};
use crate::models::connection;

/// Fields discovered for an ad account during callback or sync.
#[derive(Debug, Clone)]
pub struct AdAccountUpsert {
    pub ad_account_id: String,
    pub account_name: Option<String>,
    pub currency: Option<String>,
    pub timezone: Option<String>,
    pub account_status: Option<i32>,
}

/// Outcome of resolving an ad account within a tenant scope.
///
/// `NotOwned` and `Missing` both surface to API callers as not found, but
/// stay distinct here so the server can log which case it hit.
#[derive(Debug)]
pub enum AccountLookup {
    Found(ad_account::Model, connection::Model),
    /// The account exists but under a connection of another app or org.
    NotOwned,
    Missing,
}

/// Repository for ad account database operations
#[derive(Debug, Clone)]
pub struct AdAccountRepository {
    pub db: Arc<DatabaseConnection>,
}

impl AdAccountRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts or refreshes a discovered ad account for a connection. The
    /// reporting toggle (`is_active`) is preserved on refresh.
    pub async fn upsert_discovered(
        &self,
        connection_id: Uuid,
        upsert: AdAccountUpsert,
    ) -> Result<(), DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let active = ad_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            connection_id: Set(connection_id),
            ad_account_id: Set(upsert.ad_account_id),
            account_name: Set(upsert.account_name),
            currency: Set(upsert.currency),
            timezone: Set(upsert.timezone),
            account_status: Set(upsert.account_status),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        AdAccount::insert(active)
            .on_conflict(
                OnConflict::columns([
                    ad_account::Column::ConnectionId,
                    ad_account::Column::AdAccountId,
                ])
                .update_columns([
                    ad_account::Column::AccountName,
                    ad_account::Column::Currency,
                    ad_account::Column::Timezone,
                    ad_account::Column::AccountStatus,
                    ad_account::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    pub async fn list_for_connections(
        &self,
        connection_ids: &[Uuid],
    ) -> Result<Vec<ad_account::Model>, DbErr> {
        if connection_ids.is_empty() {
            return Ok(Vec::new());
        }
        AdAccount::find()
            .filter(ad_account::Column::ConnectionId.is_in(connection_ids.iter().copied()))
            .order_by_asc(ad_account::Column::AdAccountId)
            .all(&*self.db)
            .await
    }

    /// Lists ad accounts for an app (optionally one org), each paired with
    /// its owning connection.
    pub async fn list_for_app(
        &self,
        app_id: &str,
        org_id: Option<&str>,
        active_only: bool,
    ) -> Result<Vec<(ad_account::Model, connection::Model)>, DbErr> {
        let mut query = AdAccount::find()
            .find_also_related(connection::Entity)
            .filter(connection::Column::AppId.eq(app_id));
        if let Some(org_id) = org_id {
            query = query.filter(connection::Column::OrgId.eq(org_id));
        }
        if active_only {
            query = query.filter(ad_account::Column::IsActive.eq(true));
        }
        let rows = query
            .order_by_asc(ad_account::Column::AdAccountId)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(account, conn)| conn.map(|c| (account, c)))
            .collect())
    }

    /// Resolves an ad account by its Meta id within an app's (and optionally
    /// org's) connections, returning the owning connection alongside.
    ///
    /// Resolution happens in two steps so that a missing account and an
    /// account held by another tenant can be told apart in logs, even though
    /// both surface as not found to callers.
    pub async fn find_with_connection(
        &self,
        ad_account_id: &str,
        app_id: &str,
        org_id: Option<&str>,
    ) -> Result<AccountLookup, DbErr> {
        let rows = AdAccount::find()
            .find_also_related(connection::Entity)
            .filter(ad_account::Column::AdAccountId.eq(ad_account_id))
            .all(&*self.db)
            .await?;
        if rows.is_empty() {
            return Ok(AccountLookup::Missing);
        }

        for (account, conn) in rows {
            if let Some(conn) = conn
                && conn.app_id == app_id
                && org_id.is_none_or(|org| conn.org_id.as_deref() == Some(org))
            {
                return Ok(AccountLookup::Found(account, conn));
            }
        }

        tracing::warn!(
            ad_account_id,
            app_id,
            "Ad account exists but is held by another app or org"
        );
        Ok(AccountLookup::NotOwned)
    }

    /// Flips the reporting toggle, returning the updated row.
    pub async fn set_active(
        &self,
        account: ad_account::Model,
        is_active: bool,
    ) -> Result<ad_account::Model, DbErr> {
        let mut active: ad_account::ActiveModel = account.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().into());
        active.update(&*self.db).await
    }
}

//! Page repository for database operations

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::page::{self, Entity as Page};

/// Fields discovered for a page during callback or sync.
#[derive(Debug, Clone)]
pub struct PageUpsert {
    pub page_id: String,
    pub page_name: Option<String>,
    /// Encrypted page access token envelope.
    pub page_access_token: String,
    pub instagram_account_id: Option<String>,
}

/// Repository for page database operations
#[derive(Debug, Clone)]
pub struct PageRepository {
    pub db: Arc<DatabaseConnection>,
}

impl PageRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts or refreshes a discovered page for a connection.
    pub async fn upsert_discovered(
        &self,
        connection_id: Uuid,
        upsert: PageUpsert,
    ) -> Result<(), DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let active = page::ActiveModel {
            id: Set(Uuid::new_v4()),
            connection_id: Set(connection_id),
            page_id: Set(upsert.page_id),
            page_name: Set(upsert.page_name),
            page_access_token: Set(upsert.page_access_token),
            instagram_account_id: Set(upsert.instagram_account_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Page::insert(active)
            .on_conflict(
                OnConflict::columns([page::Column::ConnectionId, page::Column::PageId])
                    .update_columns([
                        page::Column::PageName,
                        page::Column::PageAccessToken,
                        page::Column::InstagramAccountId,
                        page::Column::UpdatedAt,
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
    ) -> Result<Vec<page::Model>, DbErr> {
        if connection_ids.is_empty() {
            return Ok(Vec::new());
        }
        Page::find()
            .filter(page::Column::ConnectionId.is_in(connection_ids.iter().copied()))
            .order_by_asc(page::Column::PageId)
            .all(&*self.db)
            .await
    }
}

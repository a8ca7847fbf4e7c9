//! Connection repository for database operations
//!
//! Encapsulates SeaORM operations for the connections table. Token values
//! passed in and out of this layer are vault envelopes; encryption happens in
//! the caller so the repository stays storage-only.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::connection::{self, Entity as Connection};

/// Fields captured from a completed OAuth callback.
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub app_id: String,
    pub org_id: Option<String>,
    pub label: Option<String>,
    pub meta_user_id: String,
    pub meta_user_name: Option<String>,
    /// Encrypted access token envelope.
    pub access_token: String,
    pub token_expires_at: Option<DateTimeWithTimeZone>,
    pub scopes: Option<JsonValue>,
}

/// Repository for connection database operations
#[derive(Debug, Clone)]
pub struct ConnectionRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ConnectionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<connection::Model>, DbErr> {
        Connection::find_by_id(id).one(&*self.db).await
    }

    /// Finds a connection only if it belongs to the given app.
    pub async fn find_by_id_and_app(
        &self,
        id: Uuid,
        app_id: &str,
    ) -> Result<Option<connection::Model>, DbErr> {
        Connection::find_by_id(id)
            .filter(connection::Column::AppId.eq(app_id))
            .one(&*self.db)
            .await
    }

    pub async fn find_by_app_and_meta_user(
        &self,
        app_id: &str,
        meta_user_id: &str,
    ) -> Result<Option<connection::Model>, DbErr> {
        Connection::find()
            .filter(connection::Column::AppId.eq(app_id))
            .filter(connection::Column::MetaUserId.eq(meta_user_id))
            .one(&*self.db)
            .await
    }

    /// Lists connections for an app, optionally narrowed to one org, newest
    /// first.
    pub async fn list_for_app(
        &self,
        app_id: &str,
        org_id: Option<&str>,
    ) -> Result<Vec<connection::Model>, DbErr> {
        let mut query = Connection::find().filter(connection::Column::AppId.eq(app_id));
        if let Some(org_id) = org_id {
            query = query.filter(connection::Column::OrgId.eq(org_id));
        }
        query
            .order_by_desc(connection::Column::CreatedAt)
            .all(&*self.db)
            .await
    }

    /// Persists a completed OAuth callback.
    ///
    /// When `upsert_by_meta_user` is set, an existing connection for the same
    /// (app_id, meta_user_id) pair is refreshed in place instead of a new row
    /// being inserted.
    pub async fn upsert_from_callback(
        &self,
        new: NewConnection,
        upsert_by_meta_user: bool,
    ) -> Result<connection::Model, DbErr> {
        if upsert_by_meta_user
            && let Some(existing) = self
                .find_by_app_and_meta_user(&new.app_id, &new.meta_user_id)
                .await?
        {
            let mut active: connection::ActiveModel = existing.into();
            active.org_id = Set(new.org_id);
            if new.label.is_some() {
                active.label = Set(new.label);
            }
            active.meta_user_name = Set(new.meta_user_name);
            active.access_token = Set(new.access_token);
            active.token_expires_at = Set(new.token_expires_at);
            active.scopes = Set(new.scopes);
            active.updated_at = Set(Utc::now().into());
            return active.update(&*self.db).await;
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let active = connection::ActiveModel {
            id: Set(Uuid::new_v4()),
            app_id: Set(new.app_id),
            org_id: Set(new.org_id),
            label: Set(new.label),
            meta_user_id: Set(new.meta_user_id),
            meta_user_name: Set(new.meta_user_name),
            access_token: Set(new.access_token),
            token_expires_at: Set(new.token_expires_at),
            scopes: Set(new.scopes),
            created_at: Set(now),
            updated_at: Set(now),
        };
        active.insert(&*self.db).await
    }

    /// Deletes a connection owned by the given app. Returns false when no
    /// such connection exists (missing and not-owned are indistinguishable).
    pub async fn delete_owned(&self, id: Uuid, app_id: &str) -> Result<bool, DbErr> {
        match self.find_by_id_and_app(id, app_id).await? {
            Some(model) => {
                model.delete(&*self.db).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

//! Connection listing handlers.

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::repositories::{AdAccountRepository, ConnectionRepository, PageRepository};
use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListConnectionsQuery {
    pub app_id: String,
    pub org_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdAccountView {
    pub ad_account_id: String,
    pub account_name: Option<String>,
    pub currency: Option<String>,
    pub timezone: Option<String>,
    pub account_status: Option<i32>,
    pub is_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub page_id: String,
    pub page_name: Option<String>,
    pub has_instagram: bool,
}

/// A connection with its discovered assets. Tokens are never included.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionView {
    pub id: Uuid,
    pub app_id: String,
    pub org_id: Option<String>,
    pub label: Option<String>,
    pub meta_user_id: String,
    pub meta_user_name: Option<String>,
    pub token_expires_at: Option<DateTime<FixedOffset>>,
    pub scopes: Option<serde_json::Value>,
    pub created_at: DateTime<FixedOffset>,
    pub ad_accounts: Vec<AdAccountView>,
    pub pages: Vec<PageView>,
}

/// Lists an app's connections with their ad accounts and pages.
#[utoipa::path(
    get,
    path = "/connections",
    params(ListConnectionsQuery),
    responses(
        (status = 200, description = "Connections for the app", body = [ConnectionView])
    ),
    tag = "connections"
)]
pub async fn list_connections(
    State(state): State<AppState>,
    Query(query): Query<ListConnectionsQuery>,
) -> Result<Json<Vec<ConnectionView>>, ApiError> {
    let connections = ConnectionRepository::new(state.db.clone())
        .list_for_app(&query.app_id, query.org_id.as_deref())
        .await?;

    let ids: Vec<Uuid> = connections.iter().map(|c| c.id).collect();
    let accounts = AdAccountRepository::new(state.db.clone())
        .list_for_connections(&ids)
        .await?;
    let pages = PageRepository::new(state.db.clone())
        .list_for_connections(&ids)
        .await?;

    let mut accounts_by_connection: HashMap<Uuid, Vec<AdAccountView>> = HashMap::new();
    for account in accounts {
        accounts_by_connection
            .entry(account.connection_id)
            .or_default()
            .push(AdAccountView {
                ad_account_id: account.ad_account_id,
                account_name: account.account_name,
                currency: account.currency,
                timezone: account.timezone,
                account_status: account.account_status,
                is_active: account.is_active,
            });
    }

    let mut pages_by_connection: HashMap<Uuid, Vec<PageView>> = HashMap::new();
    for page in pages {
        pages_by_connection
            .entry(page.connection_id)
            .or_default()
            .push(PageView {
                page_id: page.page_id,
                page_name: page.page_name,
                has_instagram: page.instagram_account_id.is_some(),
            });
    }

    let views = connections
        .into_iter()
        .map(|connection| ConnectionView {
            ad_accounts: accounts_by_connection
                .remove(&connection.id)
                .unwrap_or_default(),
            pages: pages_by_connection
                .remove(&connection.id)
                .unwrap_or_default(),
            id: connection.id,
            app_id: connection.app_id,
            org_id: connection.org_id,
            label: connection.label,
            meta_user_id: connection.meta_user_id,
            meta_user_name: connection.meta_user_name,
            token_expires_at: connection.token_expires_at,
            scopes: connection.scopes,
            created_at: connection.created_at,
        })
        .collect();

    Ok(Json(views))
}

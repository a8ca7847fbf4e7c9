//! Ad account handlers: listing, the reporting toggle, and metadata sync.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::crypto::decrypt;
use crate::error::{ApiError, not_found};
use crate::repositories::{AccountLookup, AdAccountRepository, ad_account::AdAccountUpsert};
use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListAccountsQuery {
    pub app_id: String,
    pub org_id: Option<String>,
    /// When true, only accounts enabled for reporting are returned.
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub ad_account_id: String,
    pub connection_id: Uuid,
    pub account_name: Option<String>,
    pub currency: Option<String>,
    pub timezone: Option<String>,
    pub account_status: Option<i32>,
    pub is_active: bool,
}

/// Lists ad accounts across an app's connections.
#[utoipa::path(
    get,
    path = "/accounts",
    params(ListAccountsQuery),
    responses(
        (status = 200, description = "Ad accounts for the app", body = [AccountView])
    ),
    tag = "accounts"
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<Vec<AccountView>>, ApiError> {
    let rows = AdAccountRepository::new(state.db.clone())
        .list_for_app(&query.app_id, query.org_id.as_deref(), query.active_only)
        .await?;

    let views = rows
        .into_iter()
        .map(|(account, connection)| AccountView {
            ad_account_id: account.ad_account_id,
            connection_id: connection.id,
            account_name: account.account_name,
            currency: account.currency,
            timezone: account.timezone,
            account_status: account.account_status,
            is_active: account.is_active,
        })
        .collect();

    Ok(Json(views))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AccountScopeQuery {
    pub app_id: String,
    pub org_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatchAccountBody {
    pub is_active: bool,
}

/// Toggles an ad account's inclusion in reporting.
#[utoipa::path(
    patch,
    path = "/accounts/{adAccountId}",
    params(
        ("adAccountId" = String, Path, description = "Meta ad account id"),
        AccountScopeQuery
    ),
    request_body = PatchAccountBody,
    responses(
        (status = 200, description = "Updated account", body = AccountView),
        (status = 404, description = "Ad account not found")
    ),
    tag = "accounts"
)]
pub async fn patch_account(
    State(state): State<AppState>,
    Path(ad_account_id): Path<String>,
    Query(query): Query<AccountScopeQuery>,
    Json(body): Json<PatchAccountBody>,
) -> Result<Json<AccountView>, ApiError> {
    let repo = AdAccountRepository::new(state.db.clone());
    let AccountLookup::Found(account, connection) = repo
        .find_with_connection(&ad_account_id, &query.app_id, query.org_id.as_deref())
        .await?
    else {
        return Err(not_found("Ad account not found"));
    };

    let updated = repo.set_active(account, body.is_active).await?;

    Ok(Json(AccountView {
        ad_account_id: updated.ad_account_id,
        connection_id: connection.id,
        account_name: updated.account_name,
        currency: updated.currency,
        timezone: updated.timezone,
        account_status: updated.account_status,
        is_active: updated.is_active,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub synced: usize,
}

/// Re-fetches account metadata from the Graph API for the connection owning
/// the named ad account.
#[utoipa::path(
    post,
    path = "/accounts/{adAccountId}/sync",
    params(
        ("adAccountId" = String, Path, description = "Meta ad account id"),
        AccountScopeQuery
    ),
    responses(
        (status = 200, description = "Sync summary", body = SyncResponse),
        (status = 404, description = "Ad account not found"),
        (status = 502, description = "Graph API error")
    ),
    tag = "accounts"
)]
pub async fn sync_account(
    State(state): State<AppState>,
    Path(ad_account_id): Path<String>,
    Query(query): Query<AccountScopeQuery>,
) -> Result<Json<SyncResponse>, ApiError> {
    let repo = AdAccountRepository::new(state.db.clone());
    let AccountLookup::Found(_, connection) = repo
        .find_with_connection(&ad_account_id, &query.app_id, query.org_id.as_deref())
        .await?
    else {
        return Err(not_found("Ad account not found"));
    };

    let access_token = decrypt(&state.vault_key, &connection.access_token)?;
    let listing = state.graph.get_ad_accounts(&access_token).await?;

    let mut synced = 0;
    for summary in listing.data {
        let upsert = AdAccountUpsert {
            ad_account_id: summary.account_id,
            account_name: summary.name,
            currency: summary.currency,
            timezone: summary.timezone_name,
            account_status: summary.account_status,
        };
        repo.upsert_discovered(connection.id, upsert).await?;
        synced += 1;
    }

    Ok(Json(SyncResponse { synced }))
}

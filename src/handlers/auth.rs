//! OAuth connection handlers.
//!
//! The authorize endpoint hands the platform a Meta OAuth dialog URL with
//! signed state; the callback completes the flow, stores the encrypted
//! long-lived token, and discovers the connection's ad accounts and pages
//! best-effort.

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Json, Response};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::crypto::encrypt;
use crate::error::{ApiError, ErrorType, not_found, validation_error};
use crate::oauth_state::{OAuthFlowState, decode_state, encode_state};
use crate::repositories::{
    AdAccountRepository, ConnectionRepository, PageRepository,
    ad_account::AdAccountUpsert, connection::NewConnection, page::PageUpsert,
};
use crate::server::AppState;

/// Scopes requested on every authorization.
pub const OAUTH_SCOPES: [&str; 7] = [
    "ads_read",
    "ads_management",
    "pages_read_engagement",
    "pages_manage_posts",
    "instagram_basic",
    "instagram_content_publish",
    "business_management",
];

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeQuery {
    pub app_id: String,
    pub org_id: Option<String>,
    /// Where the browser lands after the callback completes.
    pub redirect_uri: String,
    pub label: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeResponse {
    pub authorize_url: String,
}

/// Builds the Meta OAuth dialog URL for a tenant.
#[utoipa::path(
    get,
    path = "/auth/meta/authorize",
    params(AuthorizeQuery),
    responses(
        (status = 200, description = "Authorize URL built", body = AuthorizeResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 503, description = "Meta app credentials not configured")
    ),
    tag = "auth"
)]
pub async fn authorize(
    State(state): State<AppState>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    let (app_id, app_secret) = meta_app_credentials(&state)?;

    if Url::parse(&query.redirect_uri).is_err() {
        return Err(validation_error(
            "Invalid redirectUri",
            json!({ "redirectUri": "must be an absolute URL" }),
        ));
    }

    let flow_state = OAuthFlowState {
        app_id: query.app_id,
        org_id: query.org_id,
        redirect_uri: query.redirect_uri,
        label: query.label,
    };
    let signed_state = encode_state(&flow_state, app_secret).map_err(|e| {
        tracing::error!("Failed to encode OAuth state: {}", e);
        ApiError::from(ErrorType::InternalServerError)
    })?;

    let mut dialog = Url::parse(&state.config.oauth_dialog_base).map_err(|e| {
        tracing::error!("Invalid OAuth dialog base URL: {}", e);
        ApiError::from(ErrorType::InternalServerError)
    })?;
    dialog
        .query_pairs_mut()
        .append_pair("client_id", app_id)
        .append_pair("redirect_uri", &state.config.oauth_callback_url())
        .append_pair("state", &signed_state)
        .append_pair("scope", &OAUTH_SCOPES.join(","))
        .append_pair("response_type", "code");

    Ok(Json(AuthorizeResponse {
        authorize_url: dialog.to_string(),
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Completes the OAuth flow: state verification, token exchange, encrypted
/// storage, and asset discovery. The browser is redirected back to the
/// platform either way.
#[utoipa::path(
    get,
    path = "/auth/meta/callback",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Redirect back to the platform"),
        (status = 400, description = "Missing or tampered state")
    ),
    tag = "auth"
)]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let (app_id, app_secret) = meta_app_credentials(&state)?;

    let state_blob = query.state.as_deref().ok_or_else(|| {
        validation_error("Missing state", json!({ "state": "required" }))
    })?;
    let flow = decode_state(state_blob, app_secret).map_err(|e| {
        tracing::warn!("OAuth callback rejected: {}", e);
        validation_error("Invalid state", json!({ "state": e.to_string() }))
    })?;

    if let Some(error) = &query.error {
        tracing::info!(
            error,
            description = query.error_description.as_deref().unwrap_or(""),
            "OAuth dialog returned an error"
        );
        return Ok(error_redirect(&flow.redirect_uri, error));
    }

    let Some(code) = query.code.as_deref() else {
        return Err(validation_error(
            "Missing code",
            json!({ "code": "required" }),
        ));
    };

    let short_lived = match state
        .graph
        .exchange_code_for_token(app_id, app_secret, &state.config.oauth_callback_url(), code)
        .await
    {
        Ok(token) => token,
        Err(err) => {
            tracing::error!("Authorization code exchange failed: {}", err);
            return Ok(error_redirect(&flow.redirect_uri, "token_exchange_failed"));
        }
    };

    let long_lived = match state
        .graph
        .exchange_for_long_lived_token(app_id, app_secret, &short_lived.access_token)
        .await
    {
        Ok(token) => token,
        Err(err) => {
            tracing::error!("Long-lived token exchange failed: {}", err);
            return Ok(error_redirect(&flow.redirect_uri, "token_exchange_failed"));
        }
    };

    let me = match state.graph.get_me(&long_lived.access_token).await {
        Ok(me) => me,
        Err(err) => {
            tracing::error!("Profile fetch failed: {}", err);
            return Ok(error_redirect(&flow.redirect_uri, "profile_fetch_failed"));
        }
    };

    let envelope = encrypt(&state.vault_key, &long_lived.access_token)?;
    let token_expires_at = long_lived
        .expires_in
        .map(|secs| (Utc::now() + ChronoDuration::seconds(secs)).into());

    let connections = ConnectionRepository::new(state.db.clone());
    let connection = connections
        .upsert_from_callback(
            NewConnection {
                app_id: flow.app_id.clone(),
                org_id: flow.org_id.clone(),
                label: flow.label.clone(),
                meta_user_id: me.id.clone(),
                meta_user_name: me.name.clone(),
                access_token: envelope,
                token_expires_at,
                scopes: Some(json!(OAUTH_SCOPES)),
            },
            state.config.upsert_by_meta_user,
        )
        .await?;

    discover_assets(&state, connection.id, &long_lived.access_token).await;

    let mut redirect = Url::parse(&flow.redirect_uri)
        .map_err(|_| validation_error("Invalid redirect URI", json!({ "redirectUri": "invalid" })))?;
    redirect
        .query_pairs_mut()
        .append_pair("connectionId", &connection.id.to_string())
        .append_pair("status", "success");

    Ok(found_redirect(redirect.as_str()))
}

/// Best-effort discovery of ad accounts and pages for a fresh connection.
/// Failures are logged; the connection itself is already saved.
async fn discover_assets(state: &AppState, connection_id: Uuid, access_token: &str) {
    let ad_accounts = AdAccountRepository::new(state.db.clone());
    match state.graph.get_ad_accounts(access_token).await {
        Ok(page) => {
            for summary in page.data {
                let upsert = AdAccountUpsert {
                    ad_account_id: summary.account_id,
                    account_name: summary.name,
                    currency: summary.currency,
                    timezone: summary.timezone_name,
                    account_status: summary.account_status,
                };
                if let Err(err) = ad_accounts.upsert_discovered(connection_id, upsert).await {
                    tracing::warn!("Failed to store discovered ad account: {}", err);
                }
            }
        }
        Err(err) => tracing::warn!("Ad account discovery failed: {}", err),
    }

    let pages = PageRepository::new(state.db.clone());
    match state.graph.get_pages(access_token).await {
        Ok(listing) => {
            for summary in listing.data {
                let encrypted = match encrypt(&state.vault_key, &summary.access_token) {
                    Ok(envelope) => envelope,
                    Err(err) => {
                        tracing::warn!("Failed to encrypt page token: {:?}", err);
                        continue;
                    }
                };
                let upsert = PageUpsert {
                    page_id: summary.id,
                    page_name: summary.name,
                    page_access_token: encrypted,
                    instagram_account_id: summary.instagram_business_account.map(|ig| ig.id),
                };
                if let Err(err) = pages.upsert_discovered(connection_id, upsert).await {
                    tracing::warn!("Failed to store discovered page: {}", err);
                }
            }
        }
        Err(err) => tracing::warn!("Page discovery failed: {}", err),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectQuery {
    pub app_id: String,
}

/// Deletes a connection and its discovered assets.
#[utoipa::path(
    delete,
    path = "/auth/meta/connections/{connectionId}",
    params(
        ("connectionId" = Uuid, Path, description = "Connection id"),
        DisconnectQuery
    ),
    responses(
        (status = 204, description = "Connection deleted"),
        (status = 404, description = "Connection not found")
    ),
    tag = "auth"
)]
pub async fn disconnect(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
    Query(query): Query<DisconnectQuery>,
) -> Result<StatusCode, ApiError> {
    let connections = ConnectionRepository::new(state.db.clone());
    if connections.delete_owned(connection_id, &query.app_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        // Not-owned is reported the same as missing.
        Err(not_found("Connection not found"))
    }
}

fn meta_app_credentials(state: &AppState) -> Result<(&str, &str), ApiError> {
    match (
        state.config.meta_app_id.as_deref(),
        state.config.meta_app_secret.as_deref(),
    ) {
        (Some(app_id), Some(app_secret)) => Ok((app_id, app_secret)),
        _ => Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Meta app credentials are not configured",
        )),
    }
}

fn found_redirect(url: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response()
}

fn error_redirect(redirect_uri: &str, reason: &str) -> Response {
    match Url::parse(redirect_uri) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("status", "error")
                .append_pair("reason", reason);
            found_redirect(url.as_str())
        }
        Err(_) => validation_error("Invalid redirect URI", json!({ "redirectUri": "invalid" }))
            .into_response(),
    }
}

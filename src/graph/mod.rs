//! Meta Graph API client.
//!
//! Thin HTTP gateway over the Graph API: request signing with
//! `appsecret_proof`, uniform error envelope decoding, and capture of the
//! `x-business-use-case-usage` rate limit header for the usage ledger.

use hmac::{Hmac, Mac};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying per-ad-account usage metrics on Graph API responses.
pub const USAGE_HEADER: &str = "x-business-use-case-usage";

/// Default insight fields requested when the caller does not name any.
pub const DEFAULT_INSIGHT_FIELDS: [&str; 11] = [
    "impressions",
    "reach",
    "clicks",
    "spend",
    "cpc",
    "cpm",
    "ctr",
    "actions",
    "cost_per_action_type",
    "conversions",
    "cost_per_conversion",
];

/// Error envelope returned by the Graph API on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpstreamError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: UpstreamError,
}

/// Errors produced by Graph API calls.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The Graph API answered with an error envelope (or a non-2xx status).
    #[error("Graph API error {code} ({error_type}): {message}", code = .0.code, error_type = .0.error_type, message = .0.message)]
    Api(UpstreamError),
    /// The request never produced a usable response.
    #[error("Graph API transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A decoded Graph API response plus the raw usage header, if present.
#[derive(Debug)]
pub struct GraphPayload<T> {
    pub data: T,
    pub usage_header: Option<String>,
}

/// Options for a single Graph API call.
#[derive(Debug, Default)]
pub struct CallOptions<'a> {
    pub method: Option<Method>,
    pub params: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// When set, an `appsecret_proof` derived from the access token is
    /// attached to the request.
    pub app_secret: Option<&'a str>,
}

/// Paged Graph API collection response.
#[derive(Debug, Deserialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<serde_json::Value>,
}

/// `/me` profile fields used during the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct MetaUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Ad account fields requested from `/me/adaccounts`.
#[derive(Debug, Deserialize)]
pub struct AdAccountSummary {
    pub account_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub timezone_name: Option<String>,
    #[serde(default)]
    pub account_status: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct InstagramAccountRef {
    pub id: String,
}

/// Page fields requested from `/me/accounts`.
#[derive(Debug, Deserialize)]
pub struct PageSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub instagram_business_account: Option<InstagramAccountRef>,
}

/// Token endpoint response for both code exchange and long-lived exchange.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, absent for tokens that do not expire.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Explicit reporting window, serialized as `time_range` JSON on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct TimeRange {
    pub since: String,
    pub until: String,
}

/// Insight query parameters accepted by [`GraphClient::get_insights`].
#[derive(Debug, Default, Clone)]
pub struct InsightParams {
    pub date_preset: Option<String>,
    pub time_range: Option<TimeRange>,
    pub fields: Option<Vec<String>>,
    pub breakdowns: Vec<String>,
    pub level: Option<String>,
    pub time_increment: Option<String>,
    pub limit: Option<u32>,
    pub after: Option<String>,
    /// When set, insights are fetched for this object instead of the account.
    pub object_id: Option<String>,
}

/// Raw insight rows as returned by the Graph API.
#[derive(Debug, Deserialize)]
pub struct InsightRows {
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub paging: Option<serde_json::Value>,
}

/// Computes the `appsecret_proof` for an access token: the hex HMAC-SHA256
/// of the token keyed by the app secret.
pub fn compute_appsecret_proof(access_token: &str, app_secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(access_token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Builds the query parameter list for an insights call.
///
/// `date_preset` wins over `time_range` when both are present. Fields default
/// to [`DEFAULT_INSIGHT_FIELDS`] when the caller names none.
pub fn build_insight_query(params: &InsightParams) -> Vec<(String, String)> {
    let mut query = Vec::new();

    let fields = match &params.fields {
        Some(fields) if !fields.is_empty() => fields.join(","),
        _ => DEFAULT_INSIGHT_FIELDS.join(","),
    };
    query.push(("fields".to_string(), fields));

    if let Some(preset) = &params.date_preset {
        query.push(("date_preset".to_string(), preset.clone()));
    } else if let Some(range) = &params.time_range {
        let json = serde_json::json!({ "since": range.since, "until": range.until });
        query.push(("time_range".to_string(), json.to_string()));
    }

    if !params.breakdowns.is_empty() {
        query.push(("breakdowns".to_string(), params.breakdowns.join(",")));
    }
    if let Some(level) = &params.level {
        query.push(("level".to_string(), level.clone()));
    }
    if let Some(increment) = &params.time_increment {
        query.push(("time_increment".to_string(), increment.clone()));
    }
    if let Some(limit) = params.limit {
        query.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(after) = &params.after {
        query.push(("after".to_string(), after.clone()));
    }

    query
}

/// HTTP client for the Meta Graph API.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    /// Creates a client with the given API base and per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Performs a Graph API call against `path`, decoding the response body
    /// as `T` and capturing the usage header.
    pub async fn call<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        access_token: Option<&str>,
        options: CallOptions<'_>,
    ) -> Result<GraphPayload<T>, GraphError> {
        let method = options.method.unwrap_or(Method::GET);
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut query = options.params;
        if let Some(token) = access_token {
            query.push(("access_token".to_string(), token.to_string()));
            if let Some(secret) = options.app_secret {
                query.push((
                    "appsecret_proof".to_string(),
                    compute_appsecret_proof(token, secret),
                ));
            }
        }

        let mut request = self.http.request(method, &url).query(&query);
        if let Some(body) = options.body {
            request = request.json(&body);
        }

        metrics::counter!("meta_graph_requests_total").increment(1);

        let response = request.send().await?;
        let status = response.status();
        let usage_header = response
            .headers()
            .get(USAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        if !status.is_success() {
            metrics::counter!("meta_graph_errors_total").increment(1);
            let body = response.text().await.unwrap_or_default();
            let upstream = decode_upstream_error(status, &body);
            tracing::warn!(
                status = status.as_u16(),
                code = upstream.code,
                error_type = %upstream.error_type,
                path,
                "Graph API call failed"
            );
            return Err(GraphError::Api(upstream));
        }

        let data = response.json::<T>().await?;
        Ok(GraphPayload { data, usage_header })
    }

    /// Fetches the token owner's profile.
    pub async fn get_me(&self, access_token: &str) -> Result<MetaUser, GraphError> {
        let payload = self
            .call::<MetaUser>(
                "me",
                Some(access_token),
                CallOptions {
                    params: vec![("fields".to_string(), "id,name".to_string())],
                    ..CallOptions::default()
                },
            )
            .await?;
        Ok(payload.data)
    }

    /// Lists the ad accounts the token can read.
    pub async fn get_ad_accounts(
        &self,
        access_token: &str,
    ) -> Result<Paged<AdAccountSummary>, GraphError> {
        let payload = self
            .call::<Paged<AdAccountSummary>>(
                "me/adaccounts",
                Some(access_token),
                CallOptions {
                    params: vec![
                        (
                            "fields".to_string(),
                            "account_id,name,currency,timezone_name,account_status".to_string(),
                        ),
                        ("limit".to_string(), "100".to_string()),
                    ],
                    ..CallOptions::default()
                },
            )
            .await?;
        Ok(payload.data)
    }

    /// Lists the pages the token manages, including page access tokens.
    pub async fn get_pages(&self, access_token: &str) -> Result<Paged<PageSummary>, GraphError> {
        let payload = self
            .call::<Paged<PageSummary>>(
                "me/accounts",
                Some(access_token),
                CallOptions {
                    params: vec![
                        (
                            "fields".to_string(),
                            "id,name,access_token,instagram_business_account".to_string(),
                        ),
                        ("limit".to_string(), "100".to_string()),
                    ],
                    ..CallOptions::default()
                },
            )
            .await?;
        Ok(payload.data)
    }

    /// Exchanges an OAuth authorization code for a short-lived user token.
    pub async fn exchange_code_for_token(
        &self,
        app_id: &str,
        app_secret: &str,
        redirect_uri: &str,
        code: &str,
    ) -> Result<TokenResponse, GraphError> {
        let payload = self
            .call::<TokenResponse>(
                "oauth/access_token",
                None,
                CallOptions {
                    params: vec![
                        ("client_id".to_string(), app_id.to_string()),
                        ("client_secret".to_string(), app_secret.to_string()),
                        ("redirect_uri".to_string(), redirect_uri.to_string()),
                        ("code".to_string(), code.to_string()),
                    ],
                    ..CallOptions::default()
                },
            )
            .await?;
        Ok(payload.data)
    }

    /// Exchanges a short-lived user token for a long-lived one.
    pub async fn exchange_for_long_lived_token(
        &self,
        app_id: &str,
        app_secret: &str,
        access_token: &str,
    ) -> Result<TokenResponse, GraphError> {
        let payload = self
            .call::<TokenResponse>(
                "oauth/access_token",
                None,
                CallOptions {
                    params: vec![
                        ("grant_type".to_string(), "fb_exchange_token".to_string()),
                        ("client_id".to_string(), app_id.to_string()),
                        ("client_secret".to_string(), app_secret.to_string()),
                        ("fb_exchange_token".to_string(), access_token.to_string()),
                    ],
                    ..CallOptions::default()
                },
            )
            .await?;
        Ok(payload.data)
    }

    /// Fetches insight rows for an ad account (or a specific object when
    /// `params.object_id` is set), returning the usage header alongside.
    pub async fn get_insights(
        &self,
        ad_account_id: &str,
        access_token: &str,
        params: &InsightParams,
        app_secret: Option<&str>,
    ) -> Result<GraphPayload<InsightRows>, GraphError> {
        let path = match &params.object_id {
            Some(object_id) => format!("{}/insights", object_id),
            None => format!("act_{}/insights", ad_account_id.trim_start_matches("act_")),
        };

        self.call::<InsightRows>(
            &path,
            Some(access_token),
            CallOptions {
                params: build_insight_query(params),
                app_secret,
                ..CallOptions::default()
            },
        )
        .await
    }
}

/// Decodes an upstream error body; a synthesized envelope is produced when
/// the body is not the standard error shape.
fn decode_upstream_error(status: StatusCode, body: &str) -> UpstreamError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error,
        Err(_) => UpstreamError {
            message: format!("HTTP {}", status.as_u16()),
            error_type: "OAuthException".to_string(),
            code: i64::from(status.as_u16()),
            error_subcode: None,
            fbtrace_id: None,
        },
    }
}

//! Insights reporting handler.

use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::error::{validation_error, ApiError};
use crate::graph::{InsightParams, TimeRange};
use crate::insights::{InsightsOrchestrator, InsightsRequest, InsightsResponse, InsightsTuning};
use crate::repositories::AdAccountRepository;
use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct InsightsQuery {
    pub app_id: String,
    pub org_id: Option<String>,
    pub ad_account_id: String,
    pub date_preset: Option<String>,
    /// Reporting window start (YYYY-MM-DD); ignored when datePreset is present.
    pub since: Option<String>,
    /// Reporting window end (YYYY-MM-DD); required together with since.
    pub until: Option<String>,
    /// Comma-separated field list.
    pub fields: Option<String>,
    /// Comma-separated breakdown list, max 3.
    pub breakdowns: Option<String>,
    pub level: Option<String>,
    pub time_increment: Option<String>,
    pub limit: Option<u32>,
    pub after: Option<String>,
    /// Fetch insights for this campaign/adset/ad instead of the account.
    pub object_id: Option<String>,
}

fn build_time_range(
    since: Option<String>,
    until: Option<String>,
) -> Result<Option<TimeRange>, ApiError> {
    match (since, until) {
        (Some(since), Some(until)) => Ok(Some(TimeRange { since, until })),
        (None, None) => Ok(None),
        _ => Err(validation_error(
            "since and until must be provided together",
            serde_json::json!({ "timeRange": ["since and until must be provided together"] }),
        )),
    }
}

fn split_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Fetches insight rows for an ad account.
#[utoipa::path(
    get,
    path = "/insights",
    params(InsightsQuery),
    responses(
        (status = 200, description = "Insight rows", body = InsightsResponse),
        (status = 400, description = "Invalid breakdowns"),
        (status = 404, description = "Ad account not found"),
        (status = 429, description = "Account is near its Meta rate limit"),
        (status = 502, description = "Graph API error")
    ),
    tag = "insights"
)]
pub async fn get_insights(
    State(state): State<AppState>,
    Query(query): Query<InsightsQuery>,
) -> Result<Json<InsightsResponse>, ApiError> {
    let fields = split_csv(query.fields);
    let params = InsightParams {
        date_preset: query.date_preset,
        time_range: build_time_range(query.since, query.until)?,
        fields: if fields.is_empty() { None } else { Some(fields) },
        breakdowns: split_csv(query.breakdowns),
        level: query.level,
        time_increment: query.time_increment,
        limit: query.limit,
        after: query.after,
        object_id: query.object_id,
    };

    let orchestrator = InsightsOrchestrator::new(
        AdAccountRepository::new(state.db.clone()),
        Arc::clone(&state.vault_key),
        Arc::clone(&state.ledger),
        Arc::clone(&state.graph),
        Arc::clone(&state.accountant),
        state.config.meta_app_secret.clone(),
        InsightsTuning {
            rate_limit_threshold: state.config.rate_limit_threshold,
            rate_limit_retry_after: state.config.rate_limit_ttl_seconds,
        },
    );

    let response = orchestrator
        .fetch(InsightsRequest {
            app_id: query.app_id,
            org_id: query.org_id,
            ad_account_id: query.ad_account_id,
            params,
        })
        .await?;

    Ok(Json(response))
}

//! Insights orchestration.
//!
//! Ties the pipeline together for a reporting request: breakdown validation,
//! ledger pre-check, account resolution, token decryption, the Graph API
//! call, usage recording, and row aliasing for platform consumers.

use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::breakdowns::validate_breakdowns;
use crate::crypto::{VaultKey, decrypt};
use crate::error::{ApiError, not_found, rate_limited, validation_error};
use crate::graph::{GraphClient, InsightParams};
use crate::rate_limit::{RateLimitLedger, UsageMetric, is_near_limit};
use crate::repositories::{AccountLookup, AdAccountRepository};
use crate::services::UsageAccountant;

/// Snake_case Graph API keys that get a camelCase alias on outgoing rows.
const ROW_ALIASES: [(&str, &str); 12] = [
    ("campaign_id", "campaignId"),
    ("campaign_name", "campaignName"),
    ("adset_id", "adsetId"),
    ("adset_name", "adsetName"),
    ("ad_id", "adId"),
    ("ad_name", "adName"),
    ("date_start", "dateStart"),
    ("date_stop", "dateStop"),
    ("publisher_platform", "publisherPlatform"),
    ("platform_position", "platformPosition"),
    ("device_platform", "devicePlatform"),
    ("cost_per_action_type", "costPerActionType"),
];

/// A fully scoped insights request.
#[derive(Debug, Clone)]
pub struct InsightsRequest {
    pub app_id: String,
    pub org_id: Option<String>,
    pub ad_account_id: String,
    pub params: InsightParams,
}

/// Insights response returned to platform callers.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsightsResponse {
    pub ad_account_id: String,
    pub data: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<Value>,
    /// Usage metrics parsed from the response, when Meta sent any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<Vec<UsageMetric>>,
}

/// Tunables for the orchestrator, derived from configuration.
#[derive(Debug, Clone)]
pub struct InsightsTuning {
    pub rate_limit_threshold: f64,
    /// Retry hint in seconds for rate-limited responses.
    pub rate_limit_retry_after: u64,
}

/// Coordinates an insights fetch end to end.
pub struct InsightsOrchestrator {
    accounts: AdAccountRepository,
    vault_key: Arc<VaultKey>,
    ledger: Arc<RateLimitLedger>,
    graph: Arc<GraphClient>,
    accountant: Arc<dyn UsageAccountant>,
    app_secret: Option<String>,
    tuning: InsightsTuning,
}

impl InsightsOrchestrator {
    pub fn new(
        accounts: AdAccountRepository,
        vault_key: Arc<VaultKey>,
        ledger: Arc<RateLimitLedger>,
        graph: Arc<GraphClient>,
        accountant: Arc<dyn UsageAccountant>,
        app_secret: Option<String>,
        tuning: InsightsTuning,
    ) -> Self {
        Self {
            accounts,
            vault_key,
            ledger,
            graph,
            accountant,
            app_secret,
            tuning,
        }
    }

    /// Runs the full insights pipeline for one request.
    ///
    /// Validation and the ledger pre-check happen before any upstream call,
    /// so invalid or throttled requests never consume Graph API quota.
    pub async fn fetch(&self, request: InsightsRequest) -> Result<InsightsResponse, ApiError> {
        let validation = validate_breakdowns(&request.params.breakdowns);
        if !validation.valid {
            return Err(validation_error(
                "Invalid breakdowns",
                json!({ "breakdowns": validation.errors }),
            ));
        }

        if let Some(metrics) = self.ledger.current_usage(&request.ad_account_id)
            && is_near_limit(&metrics, self.tuning.rate_limit_threshold)
        {
            tracing::info!(
                ad_account_id = %request.ad_account_id,
                "Insights request short-circuited by usage ledger"
            );
            metrics::counter!("insights_throttled_total").increment(1);
            return Err(rate_limited(
                "Ad account usage is near the Meta rate limit",
                self.tuning.rate_limit_retry_after,
            ));
        }

        let AccountLookup::Found(_, connection) = self
            .accounts
            .find_with_connection(
                &request.ad_account_id,
                &request.app_id,
                request.org_id.as_deref(),
            )
            .await?
        else {
            return Err(not_found("Ad account not found"));
        };

        let access_token = decrypt(&self.vault_key, &connection.access_token)?;

        let run_id = self
            .accountant
            .create_run(&request.app_id, request.org_id.as_deref(), "meta_insights")
            .await;

        let payload = match self
            .graph
            .get_insights(
                &request.ad_account_id,
                &access_token,
                &request.params,
                self.app_secret.as_deref(),
            )
            .await
        {
            Ok(payload) => payload,
            Err(err) => {
                if let Some(run_id) = &run_id {
                    self.accountant
                        .complete_run(run_id, false, Some(&err.to_string()))
                        .await;
                }
                return Err(err.into());
            }
        };

        let mut own_usage = None;
        if let Some(header) = &payload.usage_header {
            let parsed = crate::rate_limit::parse_usage_header(Some(header.as_str()));
            for (account_id, metrics) in parsed {
                if account_id == request.ad_account_id {
                    own_usage = Some(metrics.clone());
                }
                self.ledger.record_usage(&account_id, metrics);
            }
        }

        let rows: Vec<Value> = payload.data.data.into_iter().map(alias_insight_row).collect();
        metrics::counter!("insights_fetches_total").increment(1);
        metrics::counter!("insights_rows_total").increment(rows.len() as u64);

        if let Some(run_id) = &run_id {
            self.accountant
                .add_run_costs(run_id, json!({ "apiCalls": 1, "rows": rows.len() }))
                .await;
            self.accountant.complete_run(run_id, true, None).await;
        }

        Ok(InsightsResponse {
            ad_account_id: request.ad_account_id,
            data: rows,
            paging: payload.data.paging,
            rate_limit: own_usage,
        })
    }
}

/// Adds camelCase aliases for well-known snake_case keys, preserving the
/// original keys so existing consumers keep working.
pub fn alias_insight_row(row: Value) -> Value {
    let Value::Object(mut map) = row else {
        return row;
    };

    for (snake, camel) in ROW_ALIASES {
        if let Some(value) = map.get(snake).cloned() {
            map.entry(camel.to_string()).or_insert(value);
        }
    }

    Value::Object(map)
}

//! Outbound service clients.
//!
//! The usage accountant reports insight fetches to the platform's runs
//! service. Accounting is strictly fire-and-forget: every failure is logged
//! and swallowed so reporting never blocks or breaks an insights request.

use async_trait::async_trait;
use serde_json::json;

/// Records run lifecycle events against the platform's accounting service.
#[async_trait]
pub trait UsageAccountant: Send + Sync {
    /// Opens a run, returning its id when the service accepted it.
    async fn create_run(&self, app_id: &str, org_id: Option<&str>, operation: &str)
    -> Option<String>;

    /// Attaches cost metadata to an open run.
    async fn add_run_costs(&self, run_id: &str, costs: serde_json::Value);

    /// Marks a run finished, successfully or not.
    async fn complete_run(&self, run_id: &str, success: bool, error: Option<&str>);
}

/// Accountant used when no runs service is configured.
#[derive(Debug, Default)]
pub struct NoopAccountant;

#[async_trait]
impl UsageAccountant for NoopAccountant {
    async fn create_run(&self, _: &str, _: Option<&str>, _: &str) -> Option<String> {
        None
    }

    async fn add_run_costs(&self, _: &str, _: serde_json::Value) {}

    async fn complete_run(&self, _: &str, _: bool, _: Option<&str>) {}
}

/// HTTP client for the runs service, authenticated with `X-API-Key`.
#[derive(Debug, Clone)]
pub struct HttpRunsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpRunsClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Option<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        match self
            .http
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response.json().await.ok(),
            Ok(response) => {
                tracing::warn!(
                    status = response.status().as_u16(),
                    path,
                    "Runs service rejected accounting call"
                );
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, path, "Runs service unreachable");
                None
            }
        }
    }
}

#[async_trait]
impl UsageAccountant for HttpRunsClient {
    async fn create_run(
        &self,
        app_id: &str,
        org_id: Option<&str>,
        operation: &str,
    ) -> Option<String> {
        let body = json!({
            "appId": app_id,
            "orgId": org_id,
            "operation": operation,
        });
        let response = self.post("/runs", body).await?;
        response
            .get("runId")
            .or_else(|| response.get("id"))
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
    }

    async fn add_run_costs(&self, run_id: &str, costs: serde_json::Value) {
        self.post(&format!("/runs/{}/costs", run_id), costs).await;
    }

    async fn complete_run(&self, run_id: &str, success: bool, error: Option<&str>) {
        let body = json!({
            "success": success,
            "error": error,
        });
        self.post(&format!("/runs/{}/complete", run_id), body).await;
    }
}

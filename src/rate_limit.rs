//! In-memory ledger of Meta API usage, fed by the
//! `x-business-use-case-usage` response header.
//!
//! The ledger is process-local and TTL-bounded: entries older than five
//! minutes are treated as absent and evicted lazily on read. It is shared
//! between request tasks through an [`std::sync::Mutex`]; last-write-wins on
//! the same account id is the intended policy since usage snapshots stay
//! informative regardless of arrival order.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Usage percentages reported for one business use case on an ad account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetric {
    /// Percentage of allowed call volume consumed.
    pub call_count: f64,
    /// Percentage of allowed CPU time consumed.
    pub total_cpu_time: f64,
    /// Percentage of allowed wall time consumed.
    pub total_time: f64,
    /// Business use case classification, e.g. `ads_insights`.
    #[serde(rename = "type")]
    pub usage_type: String,
    /// Seconds until upstream expects access to recover, if throttled.
    pub estimated_time_to_regain_access: f64,
}

/// Raw header shape: snake_case usage objects keyed by ad account id.
#[derive(Debug, Deserialize)]
struct RawUsage {
    call_count: f64,
    total_cputime: f64,
    total_time: f64,
    #[serde(rename = "type", default)]
    usage_type: String,
    #[serde(default)]
    estimated_time_to_regain_access: f64,
}

/// Default near-limit threshold, in percent.
pub const DEFAULT_THRESHOLD: f64 = 80.0;

/// How long a recorded usage snapshot stays authoritative.
pub const ENTRY_TTL: Duration = Duration::from_secs(5 * 60);

struct LedgerEntry {
    metrics: Vec<UsageMetric>,
    recorded_at: Instant,
}

/// Process-wide usage ledger keyed by ad account id.
///
/// Owned explicitly by the application state and injected where needed; never
/// a global static, so the TTL policy is unit-testable in isolation.
pub struct RateLimitLedger {
    entries: Mutex<HashMap<String, LedgerEntry>>,
    ttl: Duration,
}

impl Default for RateLimitLedger {
    fn default() -> Self {
        Self::new(ENTRY_TTL)
    }
}

impl RateLimitLedger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Record usage for an ad account, replacing any prior snapshot.
    pub fn record_usage(&self, account_id: &str, metrics: Vec<UsageMetric>) {
        let mut entries = self.entries.lock().expect("ledger mutex poisoned");
        entries.insert(
            account_id.to_string(),
            LedgerEntry {
                metrics,
                recorded_at: Instant::now(),
            },
        );
    }

    /// Current usage for an ad account, or `None` if never recorded or the
    /// snapshot has aged past the TTL (in which case it is evicted).
    pub fn current_usage(&self, account_id: &str) -> Option<Vec<UsageMetric>> {
        let mut entries = self.entries.lock().expect("ledger mutex poisoned");
        match entries.get(account_id) {
            Some(entry) if entry.recorded_at.elapsed() <= self.ttl => Some(entry.metrics.clone()),
            Some(_) => {
                entries.remove(account_id);
                None
            }
            None => None,
        }
    }
}

/// True if any usage percentage in any metric meets or exceeds the threshold.
pub fn is_near_limit(metrics: &[UsageMetric], threshold: f64) -> bool {
    metrics.iter().any(|m| {
        m.call_count >= threshold || m.total_cpu_time >= threshold || m.total_time >= threshold
    })
}

/// Parse the `x-business-use-case-usage` header into per-account metrics.
///
/// The header value is a JSON object mapping ad account ids to arrays of
/// snake_case usage objects. Absent or malformed input yields an empty map;
/// this path never fails.
pub fn parse_usage_header(header: Option<&str>) -> HashMap<String, Vec<UsageMetric>> {
    let Some(raw) = header else {
        return HashMap::new();
    };

    let parsed: HashMap<String, Vec<RawUsage>> = match serde_json::from_str(raw) {
        Ok(parsed) => parsed,
        Err(_) => return HashMap::new(),
    };

    parsed
        .into_iter()
        .map(|(account_id, usages)| {
            let metrics = usages
                .into_iter()
                .map(|u| UsageMetric {
                    call_count: u.call_count,
                    total_cpu_time: u.total_cputime,
                    total_time: u.total_time,
                    usage_type: u.usage_type,
                    estimated_time_to_regain_access: u.estimated_time_to_regain_access,
                })
                .collect();
            (account_id, metrics)
        })
        .collect()
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_queries: u64,
    pub successful: u64,
    pub failed: u64,
    /// Fraction in `[0, 1]`; 0 before the first query.
    pub success_rate: f64,
    pub uptime_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheSummary {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Latency in seconds. `average` is over every query ever recorded, the
/// rest over the retained window only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentStats {
    pub mean: f64,
    pub median: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenSummary {
    pub total: u64,
    pub average_per_query: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<Overview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyStats>,
    pub components: BTreeMap<String, ComponentStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenSummary>,
    pub errors: BTreeMap<String, u64>,
}

impl MetricsSummary {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            overview: None,
            cache: None,
            latency: None,
            components: BTreeMap::new(),
            tokens: None,
            errors: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    /// Mean latency per bucket, seconds.
    pub latencies: Vec<f64>,
    /// Fraction of successful queries per bucket.
    pub success_rates: Vec<f64>,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() { return 0.0; }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of an ascending slice; 0 when empty.
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Cut point `i` of `n` equal-probability intervals over an ascending
/// slice, using the exclusive method (positions scaled by `len + 1`).
/// Needs at least two values.
pub fn quantile_exclusive(sorted: &[f64], n: usize, i: usize) -> Option<f64> {
    let len = sorted.len();
    if len < 2 || n == 0 || i == 0 || i >= n { return None; }
    let m = len + 1;
    let j = (i * m / n).clamp(1, len - 1);
    let delta = (i * m) as f64 - (j * n) as f64;
    let n = n as f64;
    Some((sorted[j - 1] * (n - delta) + sorted[j] * delta) / n)
}

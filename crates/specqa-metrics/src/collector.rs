use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use chrono::{DateTime, Timelike, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use specqa_core::config::Settings;

use crate::stats::{
    mean, median, quantile_exclusive, CacheSummary, ComponentStats, LatencyStats, MetricsSummary, Overview,
    TimeSeries, TokenSummary,
};

const QUERY_PREVIEW_CHARS: usize = 100;

/// One query outcome, as handed to [`MetricsCollector::record`].
#[derive(Debug, Clone, Default)]
pub struct QueryRecord {
    pub query: String,
    pub success: bool,
    pub latency: Duration,
    pub cache_hit: bool,
    pub confidence: Option<f64>,
    pub error: Option<String>,
    pub tokens_used: Option<u64>,
    pub retrieval_scores: Option<Vec<f32>>,
    pub component_times: BTreeMap<String, Duration>,
}

impl QueryRecord {
    pub fn new(query: impl Into<String>, success: bool, latency: Duration) -> Self {
        Self { query: query.into(), success, latency, ..Self::default() }
    }

    #[must_use]
    pub fn cache_hit(mut self, hit: bool) -> Self {
        self.cache_hit = hit;
        self
    }

    #[must_use]
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    #[must_use]
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    #[must_use]
    pub fn tokens_used(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    #[must_use]
    pub fn retrieval_scores(mut self, scores: Vec<f32>) -> Self {
        self.retrieval_scores = Some(scores);
        self
    }

    #[must_use]
    pub fn component(mut self, name: impl Into<String>, time: Duration) -> Self {
        self.component_times.insert(name.into(), time);
        self
    }
}

/// A retained window entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySample {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub success: bool,
    pub latency_secs: f64,
    pub cache_hit: bool,
    pub confidence: Option<f64>,
    pub error: Option<String>,
    pub tokens_used: Option<u64>,
    pub retrieval_scores: Option<Vec<f32>>,
    pub component_times: BTreeMap<String, f64>,
}

#[derive(Debug, Default)]
struct Totals {
    queries: u64,
    successful: u64,
    failed: u64,
    cache_hits: u64,
    cache_misses: u64,
    latency_secs: f64,
    tokens: u64,
    errors_by_type: BTreeMap<String, u64>,
}

struct State {
    window: VecDeque<QuerySample>,
    totals: Totals,
    started: Instant,
}

impl State {
    fn new(window_size: usize) -> Self {
        Self { window: VecDeque::with_capacity(window_size), totals: Totals::default(), started: Instant::now() }
    }
}

pub struct MetricsCollector {
    enabled: bool,
    window_size: usize,
    state: Mutex<State>,
}

impl MetricsCollector {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        info!(window_size, "metrics collector initialized");
        Self { enabled: true, window_size, state: Mutex::new(State::new(window_size)) }
    }

    pub fn disabled() -> Self { Self { enabled: false, window_size: 1, state: Mutex::new(State::new(0)) } }

    pub fn from_settings(settings: &Settings) -> Self {
        if settings.metrics_enabled {
            Self::new(settings.metrics_window_size)
        } else {
            debug!("metrics collection disabled");
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool { self.enabled }

    pub fn window_size(&self) -> usize { self.window_size }

    pub fn record(&self, record: QueryRecord) { self.record_at(record, Utc::now()); }

    /// Like [`record`](Self::record) with an explicit timestamp.
    pub fn record_at(&self, record: QueryRecord, timestamp: DateTime<Utc>) {
        if !self.enabled { return; }
        let latency_secs = record.latency.as_secs_f64();
        let mut state = self.state.lock();

        let totals = &mut state.totals;
        totals.queries += 1;
        if record.success { totals.successful += 1 } else { totals.failed += 1 }
        if record.cache_hit { totals.cache_hits += 1 } else { totals.cache_misses += 1 }
        totals.latency_secs += latency_secs;
        totals.tokens += record.tokens_used.unwrap_or(0);

        let sample = QuerySample {
            timestamp,
            query: record.query.chars().take(QUERY_PREVIEW_CHARS).collect(),
            success: record.success,
            latency_secs,
            cache_hit: record.cache_hit,
            confidence: record.confidence,
            error: record.error,
            tokens_used: record.tokens_used,
            retrieval_scores: record.retrieval_scores,
            component_times: record.component_times.into_iter().map(|(k, v)| (k, v.as_secs_f64())).collect(),
        };
        if state.window.len() == self.window_size {
            state.window.pop_front();
        }
        state.window.push_back(sample);
    }

    pub fn record_error(&self, kind: &str, message: &str) {
        if !self.enabled { return; }
        *self.state.lock().totals.errors_by_type.entry(kind.to_string()).or_insert(0) += 1;
        debug!(kind, message, "recorded error");
    }

    pub fn summary(&self) -> MetricsSummary {
        if !self.enabled { return MetricsSummary::disabled(); }
        let state = self.state.lock();
        let t = &state.totals;
        let ratio = |num: u64| if t.queries == 0 { 0.0 } else { num as f64 / t.queries as f64 };

        let overview = Overview {
            total_queries: t.queries,
            successful: t.successful,
            failed: t.failed,
            success_rate: ratio(t.successful),
            uptime_seconds: state.started.elapsed().as_secs_f64(),
        };
        let cache = CacheSummary { hits: t.cache_hits, misses: t.cache_misses, hit_rate: ratio(t.cache_hits) };
        let tokens = TokenSummary {
            total: t.tokens,
            average_per_query: if t.queries == 0 { 0.0 } else { t.tokens as f64 / t.queries as f64 },
        };

        let mut latencies: Vec<f64> = state.window.iter().map(|s| s.latency_secs).collect();
        latencies.sort_by(f64::total_cmp);
        let latency = (!latencies.is_empty()).then(|| LatencyStats {
            average: t.latency_secs / t.queries as f64,
            min: latencies[0],
            max: latencies[latencies.len() - 1],
            mean: mean(&latencies),
            median: median(&latencies),
            p95: if latencies.len() > 20 { quantile_exclusive(&latencies, 20, 19) } else { None },
            p99: if latencies.len() > 100 { quantile_exclusive(&latencies, 100, 99) } else { None },
        });

        let mut per_component: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for sample in &state.window {
            for (name, secs) in &sample.component_times {
                per_component.entry(name.clone()).or_default().push(*secs);
            }
        }
        if !latencies.is_empty() {
            per_component.insert("total".to_string(), latencies.clone());
        }
        let components = per_component
            .into_iter()
            .map(|(name, mut times)| {
                times.sort_by(f64::total_cmp);
                let stats = ComponentStats { mean: mean(&times), median: median(&times), samples: times.len() };
                (name, stats)
            })
            .collect();

        MetricsSummary {
            enabled: true,
            overview: Some(overview),
            cache: Some(cache),
            latency,
            components,
            tokens: Some(tokens),
            errors: t.errors_by_type.clone(),
        }
    }

    /// The last `limit` retained samples, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<QuerySample> {
        if !self.enabled { return vec![]; }
        let state = self.state.lock();
        let skip = state.window.len().saturating_sub(limit);
        state.window.iter().skip(skip).cloned().collect()
    }

    /// Retained samples grouped into `interval_minutes` buckets within each
    /// hour, in time order.
    pub fn time_series(&self, interval_minutes: u32) -> TimeSeries {
        if !self.enabled { return TimeSeries::default(); }
        let interval = interval_minutes.clamp(1, 60);
        let state = self.state.lock();

        let mut buckets: BTreeMap<DateTime<Utc>, (Vec<f64>, usize)> = BTreeMap::new();
        for sample in &state.window {
            let bucket = bucket_start(sample.timestamp, interval);
            let entry = buckets.entry(bucket).or_default();
            entry.0.push(sample.latency_secs);
            if sample.success { entry.1 += 1; }
        }

        let mut series = TimeSeries::default();
        for (start, (latencies, successes)) in buckets {
            series.timestamps.push(start);
            series.latencies.push(mean(&latencies));
            series.success_rates.push(successes as f64 / latencies.len() as f64);
        }
        series
    }

    /// Forget everything, including totals, and restart the uptime clock.
    pub fn reset(&self) {
        if !self.enabled { return; }
        *self.state.lock() = State::new(self.window_size);
        info!("metrics reset");
    }
}

fn bucket_start(ts: DateTime<Utc>, interval: u32) -> DateTime<Utc> {
    ts.with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_minute(t.minute() / interval * interval))
        .unwrap_or(ts)
}

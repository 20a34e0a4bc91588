use std::time::Duration;

use chrono::{TimeZone, Utc};

use specqa_core::config::Settings;
use specqa_metrics::{MetricsCollector, QueryRecord};

fn ms(n: u64) -> Duration { Duration::from_millis(n) }

#[test]
fn totals_and_rates_accumulate() {
    let metrics = MetricsCollector::new(10);
    metrics.record(QueryRecord::new("q1", true, ms(100)).cache_hit(true).tokens_used(40));
    metrics.record(QueryRecord::new("q2", true, ms(300)).tokens_used(60));
    metrics.record(QueryRecord::new("q3", false, ms(200)).error("timeout"));

    let s = metrics.summary();
    assert!(s.enabled);
    let overview = s.overview.expect("overview");
    assert_eq!(overview.total_queries, 3);
    assert_eq!(overview.successful, 2);
    assert_eq!(overview.failed, 1);
    assert!((overview.success_rate - 2.0 / 3.0).abs() < 1e-12);

    let cache = s.cache.expect("cache");
    assert_eq!((cache.hits, cache.misses), (1, 2));

    let latency = s.latency.expect("latency");
    assert!((latency.min - 0.1).abs() < 1e-9);
    assert!((latency.max - 0.3).abs() < 1e-9);
    assert!((latency.median - 0.2).abs() < 1e-9);
    assert!((latency.average - 0.2).abs() < 1e-9);
    assert!(latency.p95.is_none() && latency.p99.is_none());

    let tokens = s.tokens.expect("tokens");
    assert_eq!(tokens.total, 100);
    assert!((tokens.average_per_query - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn window_evicts_oldest_but_totals_persist() {
    let metrics = MetricsCollector::new(3);
    for i in 1..=5 {
        metrics.record(QueryRecord::new(format!("q{i}"), true, ms(i * 100)));
    }
    let recent = metrics.recent(10);
    let queries: Vec<&str> = recent.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(queries, ["q3", "q4", "q5"]);

    let s = metrics.summary();
    assert_eq!(s.overview.expect("overview").total_queries, 5);
    let latency = s.latency.expect("latency");
    assert!((latency.min - 0.3).abs() < 1e-9, "min covers the window only");
    assert!((latency.average - 0.3).abs() < 1e-9, "average covers every query");
    assert_eq!(metrics.recent(2).len(), 2);
}

#[test]
fn percentiles_need_enough_samples() {
    let metrics = MetricsCollector::new(200);
    for i in 1..=20 {
        metrics.record(QueryRecord::new("q", true, ms(i)));
    }
    assert!(metrics.summary().latency.expect("latency").p95.is_none());

    metrics.record(QueryRecord::new("q", true, ms(21)));
    let latency = metrics.summary().latency.expect("latency");
    let p95 = latency.p95.expect("p95 with 21 samples");
    assert!((p95 - 0.0209).abs() < 1e-9);
    assert!(latency.p99.is_none());

    for i in 22..=101 {
        metrics.record(QueryRecord::new("q", true, ms(i)));
    }
    assert!(metrics.summary().latency.expect("latency").p99.is_some());
}

#[test]
fn component_times_are_summarized() {
    let metrics = MetricsCollector::new(10);
    metrics.record(
        QueryRecord::new("q", true, ms(500)).component("retrieval", ms(100)).component("generation", ms(400)),
    );
    metrics.record(
        QueryRecord::new("q", true, ms(700)).component("retrieval", ms(300)).component("generation", ms(400)),
    );
    let components = metrics.summary().components;
    let retrieval = &components["retrieval"];
    assert_eq!(retrieval.samples, 2);
    assert!((retrieval.mean - 0.2).abs() < 1e-9);
    assert_eq!(components["total"].samples, 2);
    assert!((components["total"].median - 0.6).abs() < 1e-9);
}

#[test]
fn errors_are_counted_by_kind() {
    let metrics = MetricsCollector::new(10);
    metrics.record_error("retrieval", "both paths failed");
    metrics.record_error("retrieval", "both paths failed");
    metrics.record_error("generation", "timeout");
    let errors = metrics.summary().errors;
    assert_eq!(errors["retrieval"], 2);
    assert_eq!(errors["generation"], 1);
}

#[test]
fn query_text_is_truncated() {
    let metrics = MetricsCollector::new(10);
    metrics.record(QueryRecord::new("x".repeat(250), true, ms(1)));
    assert_eq!(metrics.recent(1)[0].query.chars().count(), 100);
}

#[test]
fn time_series_buckets_by_interval() {
    let metrics = MetricsCollector::new(10);
    let at = |h, m, s| Utc.with_ymd_and_hms(2026, 3, 1, h, m, s).single().expect("valid time");
    metrics.record_at(QueryRecord::new("a", true, ms(100)), at(10, 1, 5));
    metrics.record_at(QueryRecord::new("b", false, ms(300)), at(10, 4, 59));
    metrics.record_at(QueryRecord::new("c", true, ms(200)), at(10, 7, 0));

    let series = metrics.time_series(5);
    assert_eq!(series.timestamps, [at(10, 0, 0), at(10, 5, 0)]);
    assert!((series.latencies[0] - 0.2).abs() < 1e-9);
    assert_eq!(series.success_rates, [0.5, 1.0]);
}

#[test]
fn reset_clears_totals_and_window() {
    let metrics = MetricsCollector::new(10);
    metrics.record(QueryRecord::new("q", true, ms(1)));
    metrics.record_error("x", "y");
    metrics.reset();
    let s = metrics.summary();
    assert_eq!(s.overview.expect("overview").total_queries, 0);
    assert!(s.latency.is_none());
    assert!(s.errors.is_empty());
}

#[test]
fn disabled_collector_records_nothing() {
    let settings = Settings { metrics_enabled: false, ..Settings::default() };
    let metrics = MetricsCollector::from_settings(&settings);
    metrics.record(QueryRecord::new("q", true, ms(1)));
    let s = metrics.summary();
    assert!(!s.enabled);
    assert!(s.overview.is_none());
    assert!(metrics.recent(5).is_empty());
    let json = serde_json::to_value(&s).expect("serialize");
    assert_eq!(json["enabled"], false);
    assert!(json.get("overview").is_none());
}

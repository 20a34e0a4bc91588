use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use specqa_core::config::Settings;

use crate::clock::{Clock, SystemClock};

/// Hash of the lowercased, trimmed query, plus the context when it carries
/// anything. Context maps serialize with sorted keys, so key order in the
/// caller's map does not matter.
pub fn cache_key(query: &str, context: Option<&Value>) -> String {
    let mut data = query.trim().to_lowercase();
    if let Some(ctx) = context.filter(|c| !is_empty_context(c)) {
        data.push('|');
        write_canonical(ctx, &mut data);
    }
    blake3::hash(data.as_bytes()).to_hex().to_string()
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 { out.push(','); }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 { out.push(','); }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn is_empty_context(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn preview(query: &str) -> String { query.chars().take(50).collect() }

struct Entry<V> {
    value: V,
    query: String,
    stored_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    ttl_expirations: u64,
}

struct Inner<V> {
    entries: LruCache<String, Entry<V>>,
    counters: Counters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, 0 before the first request.
    pub hit_rate: f64,
    pub evictions: u64,
    pub ttl_expirations: u64,
    pub total_requests: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentQuery {
    pub query: String,
    pub stored_at: DateTime<Utc>,
}

/// Least-recently-used response cache with lazy TTL expiry.
///
/// One mutex guards entries and counters together, so concurrent callers
/// never see recency order and statistics disagree.
pub struct QueryCache<V> {
    enabled: bool,
    max_size: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(max_size: usize, ttl: Duration) -> Self { Self::with_clock(max_size, ttl, Arc::new(SystemClock)) }

    pub fn with_clock(max_size: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        info!(max_size = capacity.get(), ttl_secs = ttl.as_secs(), "query cache initialized");
        Self {
            enabled: true,
            max_size: capacity.get(),
            ttl,
            clock,
            inner: Mutex::new(Inner { entries: LruCache::new(capacity), counters: Counters::default() }),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        let mut cache = Self::new(1, Duration::ZERO);
        cache.enabled = false;
        cache
    }

    pub fn from_settings(settings: &Settings) -> Self {
        if settings.cache_enabled {
            Self::new(settings.cache_max_size, Duration::from_secs(settings.cache_ttl_seconds))
        } else {
            debug!("query cache disabled");
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool { self.enabled }

    fn is_expired(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let age = (now - stored_at).to_std().unwrap_or_default();
        age >= self.ttl
    }

    pub fn get(&self, query: &str, context: Option<&Value>) -> Option<V> {
        if !self.enabled { return None; }
        let key = cache_key(query, context);
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let Some(stored_at) = inner.entries.peek(&key).map(|e| e.stored_at) else {
            inner.counters.misses += 1;
            return None;
        };
        if self.is_expired(stored_at, now) {
            inner.entries.pop(&key);
            inner.counters.ttl_expirations += 1;
            inner.counters.misses += 1;
            debug!(query = %preview(query), "cache entry expired");
            return None;
        }

        let value = inner.entries.get(&key).map(|e| e.value.clone());
        inner.counters.hits += 1;
        debug!(query = %preview(query), "cache hit");
        value
    }

    pub fn set(&self, query: &str, value: V, context: Option<&Value>) {
        if !self.enabled { return; }
        let key = cache_key(query, context);
        let entry = Entry { value, query: query.to_string(), stored_at: self.clock.now() };
        let mut inner = self.inner.lock();

        if inner.entries.len() >= self.max_size && !inner.entries.contains(&key) {
            if inner.entries.pop_lru().is_some() {
                inner.counters.evictions += 1;
                debug!("cache full, evicted least recently used entry");
            }
        }
        inner.entries.put(key, entry);
    }

    /// Drop every entry. Statistics are cumulative and survive.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        info!(removed, "query cache cleared");
    }

    /// Sweep all expired entries; returns how many were removed.
    pub fn remove_expired(&self) -> usize {
        if !self.enabled { return 0; }
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| self.is_expired(e.stored_at, now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            inner.entries.pop(key);
        }
        inner.counters.ttl_expirations += expired.len() as u64;
        if !expired.is_empty() {
            info!(removed = expired.len(), "removed expired cache entries");
        }
        expired.len()
    }

    /// Most recently used entries first.
    pub fn recent_queries(&self, limit: usize) -> Vec<RecentQuery> {
        if !self.enabled { return vec![]; }
        self.inner
            .lock()
            .entries
            .iter()
            .take(limit)
            .map(|(_, e)| RecentQuery { query: e.query.clone(), stored_at: e.stored_at })
            .collect()
    }

    pub fn len(&self) -> usize { self.inner.lock().entries.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn get_stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let c = &inner.counters;
        let total_requests = c.hits + c.misses;
        let hit_rate = if total_requests == 0 { 0.0 } else { c.hits as f64 / total_requests as f64 };
        CacheStats {
            enabled: self.enabled,
            size: inner.entries.len(),
            max_size: self.max_size,
            hits: c.hits,
            misses: c.misses,
            hit_rate,
            evictions: c.evictions,
            ttl_expirations: c.ttl_expirations,
            total_requests,
        }
    }
}

//! Prometheus metrics collection for venus.
//!
//! Every series carries the const labels `application="venus"` and
//! `version=<crate version>`.
//!
//! ## Service Metrics
//!
//! - `venus_http_requests_total{class}` - Requests by status class (2xx, 3xx, ...)
//! - `venus_redirect_total{outcome}` - Redirect results (permanent, temporary, unknown_url, ...)
//! - `venus_cache_requests_total{cache,result}` - Multi-level cache lookups
//! - `venus_cache_entries{cache}` - First-level entries per cache (gauge)
//! - `venus_report_buffered{kind}` - Report records waiting for a flush

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::collections::HashMap;
use std::sync::{Once, OnceLock};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

static INIT: Once = Once::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let labels = HashMap::from([
            ("application".to_string(), "venus".to_string()),
            ("version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
        ]);
        match Registry::new_custom(None, Some(labels)) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid const labels, using a bare registry");
                Registry::new()
            }
        }
    })
}

// ========================================================================
// HTTP
// ========================================================================

/// Requests served by status class.
pub static HTTP_REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Request latency by status class.
pub static HTTP_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Redirect results by outcome.
pub static REDIRECTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Every hit on the redirect endpoint, whatever the outcome.
pub static REDIRECT_REQUESTS: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Cache
// ========================================================================

/// Lookups by level: primary_hit, secondary_hit, miss.
pub static CACHE_REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Loader invocations by result.
pub static CACHE_LOADS: OnceLock<IntCounterVec> = OnceLock::new();

pub static CACHE_LOAD_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// First-level size-based or time-based evictions.
pub static CACHE_EVICTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// First-level entry count, refreshed by the cache metrics task.
pub static CACHE_ENTRIES: OnceLock<IntGaugeVec> = OnceLock::new();

/// Cluster messages received, by how they were handled.
pub static CACHE_MESSAGES: OnceLock<IntCounterVec> = OnceLock::new();

/// Callback notifications that could not be delivered.
pub static CACHE_CONSISTENCY_ALARMS: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Reporting
// ========================================================================

pub static REPORT_BUFFERED: OnceLock<IntGaugeVec> = OnceLock::new();

/// Records persisted.
pub static REPORT_FLUSHED: OnceLock<IntCounterVec> = OnceLock::new();

/// Batches dropped after a failed save.
pub static REPORT_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init() {
    INIT.call_once(register_all);
}

fn register_all() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(HTTP_REQUESTS, IntCounterVec::new(Opts::new("venus_http_requests_total", "HTTP requests by status class"), &["class"]));
    register!(HTTP_LATENCY, HistogramVec::new(
        HistogramOpts::new("venus_http_request_duration_seconds", "HTTP request latency by status class")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["class"]));
    register!(REDIRECTS, IntCounterVec::new(Opts::new("venus_redirect_total", "Redirect results by outcome"), &["outcome"]));
    register!(REDIRECT_REQUESTS, IntCounter::new("http_redirect_request_total_count", "Requests to the redirect endpoint"));

    register!(CACHE_REQUESTS, IntCounterVec::new(Opts::new("venus_cache_requests_total", "Cache lookups by result"), &["cache", "result"]));
    register!(CACHE_LOADS, IntCounterVec::new(Opts::new("venus_cache_loads_total", "Cache loader invocations by result"), &["cache", "result"]));
    register!(CACHE_LOAD_LATENCY, HistogramVec::new(
        HistogramOpts::new("venus_cache_load_duration_seconds", "Cache loader latency")
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["cache"]));
    register!(CACHE_EVICTIONS, IntCounterVec::new(Opts::new("venus_cache_evictions_total", "First-level cache evictions"), &["cache"]));
    register!(CACHE_ENTRIES, IntGaugeVec::new(Opts::new("venus_cache_entries", "First-level cache entries"), &["cache"]));
    register!(CACHE_MESSAGES, IntCounterVec::new(Opts::new("venus_cache_messages_total", "Cluster cache messages received"), &["result"]));
    register!(CACHE_CONSISTENCY_ALARMS, IntCounter::new("venus_cache_consistency_alarms_total", "Undelivered cache callback notifications"));

    register!(REPORT_BUFFERED, IntGaugeVec::new(Opts::new("venus_report_buffered", "Report records waiting for a flush"), &["kind"]));
    register!(REPORT_FLUSHED, IntCounterVec::new(Opts::new("venus_report_flushed_total", "Report records persisted"), &["kind"]));
    register!(REPORT_FAILURES, IntCounterVec::new(Opts::new("venus_report_failures_total", "Report batches dropped after a failed save"), &["kind"]));

    #[cfg(target_os = "linux")]
    {
        let pc = prometheus::process_collector::ProcessCollector::for_self();
        if let Err(e) = r.register(Box::new(pc)) {
            tracing::warn!(error = %e, "Failed to register process collector");
        }
    }
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn inc(metric: &OnceLock<IntCounterVec>, labels: &[&str], by: u64) {
    if let Some(c) = metric.get() {
        c.with_label_values(labels).inc_by(by);
    }
}

/// Record a served HTTP request.
#[inline]
pub fn record_http_request(class: &str, duration_secs: f64) {
    inc(&HTTP_REQUESTS, &[class], 1);
    if let Some(h) = HTTP_LATENCY.get() {
        h.with_label_values(&[class]).observe(duration_secs);
    }
}

/// Record one redirect outcome.
#[inline]
pub fn record_redirect(outcome: &str) {
    if let Some(c) = REDIRECT_REQUESTS.get() {
        c.inc();
    }
    inc(&REDIRECTS, &[outcome], 1);
}

#[inline]
pub fn record_cache_lookup(cache: &str, result: &str) {
    inc(&CACHE_REQUESTS, &[cache, result], 1);
}

#[inline]
pub fn record_cache_load(cache: &str, success: bool, duration_secs: f64) {
    let result = if success { "success" } else { "failure" };
    inc(&CACHE_LOADS, &[cache, result], 1);
    if let Some(h) = CACHE_LOAD_LATENCY.get() {
        h.with_label_values(&[cache]).observe(duration_secs);
    }
}

#[inline]
pub fn record_cache_eviction(cache: &str) {
    inc(&CACHE_EVICTIONS, &[cache], 1);
}

#[inline]
pub fn set_cache_entries(cache: &str, count: u64) {
    if let Some(g) = CACHE_ENTRIES.get() {
        g.with_label_values(&[cache]).set(count as i64);
    }
}

#[inline]
pub fn record_cache_message(result: &str) {
    inc(&CACHE_MESSAGES, &[result], 1);
}

#[inline]
pub fn record_consistency_alarm() {
    if let Some(c) = CACHE_CONSISTENCY_ALARMS.get() {
        c.inc();
    }
}

#[inline]
pub fn set_report_buffered(kind: &str, len: usize) {
    if let Some(g) = REPORT_BUFFERED.get() {
        g.with_label_values(&[kind]).set(len as i64);
    }
}

#[inline]
pub fn record_report_flushed(kind: &str, count: usize) {
    inc(&REPORT_FLUSHED, &[kind], count as u64);
}

#[inline]
pub fn record_report_failure(kind: &str) {
    inc(&REPORT_FAILURES, &[kind], 1);
}

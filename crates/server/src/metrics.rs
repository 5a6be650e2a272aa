//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the mediastore server:
//! - HTTP request metrics (latency, counts, auth failures)
//! - Catalog size (collected dynamically)
//! - Core sync, purchase and external service metrics

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediastore_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediastore_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediastore_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures on admin routes.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediastore_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

/// Storefront purchase requests rejected by the honeypot field.
pub static BOT_REJECTIONS_TOTAL: Lazy<prometheus::IntCounter> = Lazy::new(|| {
    prometheus::IntCounter::new(
        "mediastore_bot_rejections_total",
        "Purchase requests rejected as automated",
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics (collected dynamically)
// =============================================================================

/// Catalog entries by state.
pub static CATALOG_ENTRIES: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("mediastore_catalog_entries", "Catalog entries by state"),
        &["state"], // "active", "expired"
    )
    .unwrap()
});

/// Bytes held by active recordings.
pub static CATALOG_ACTIVE_BYTES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediastore_catalog_active_bytes",
        "Total size of active recordings",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(BOT_REJECTIONS_TOTAL.clone()))
        .unwrap();

    // Catalog
    registry
        .register(Box::new(CATALOG_ENTRIES.clone()))
        .unwrap();
    registry
        .register(Box::new(CATALOG_ACTIVE_BYTES.clone()))
        .unwrap();

    // Core metrics (sync, purchases, external services)
    for metric in mediastore_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh gauges from current application state before encoding.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    match state.catalog().stats() {
        Ok(stats) => {
            CATALOG_ENTRIES
                .with_label_values(&["active"])
                .set(stats.active_entries as i64);
            CATALOG_ENTRIES
                .with_label_values(&["expired"])
                .set(stats.expired_entries as i64);
            CATALOG_ACTIVE_BYTES.set(stats.active_size_bytes as i64);
        }
        Err(e) => tracing::warn!(error = %e, "Catalog stats unavailable for metrics"),
    }
}

/// Collapse numeric path segments so ids don't explode label cardinality.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

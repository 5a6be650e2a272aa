//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Inventory sync passes and per-file outcomes
//! - Purchase initiation and confirmation
//! - External services (file host, payment processor)

use std::time::Instant;

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Sync Metrics
// =============================================================================

/// Sync passes total by result.
pub static SYNC_PASSES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediastore_sync_passes_total", "Total inventory sync passes"),
        &["result"], // "success", "transport_error", "failed"
    )
    .unwrap()
});

/// Sync pass duration in seconds.
pub static SYNC_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediastore_sync_duration_seconds",
            "Duration of inventory sync passes",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["result"],
    )
    .unwrap()
});

/// Files processed by outcome.
pub static SYNC_FILES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediastore_sync_files_total", "Files processed by sync passes"),
        &["outcome"], // "added", "updated", "expired", "removed", "purged", "skipped"
    )
    .unwrap()
});

// =============================================================================
// Purchase Metrics
// =============================================================================

/// Checkout sessions requested, by result.
pub static PURCHASES_INITIATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediastore_purchases_initiated_total",
            "Total purchase initiations",
        ),
        &["result"], // "success", "not_found", "failed"
    )
    .unwrap()
});

/// Confirmations by result.
pub static PURCHASES_CONFIRMED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediastore_purchases_confirmed_total",
            "Total purchase confirmations",
        ),
        &["result"], // "paid", "duplicate", "not_paid", "failed"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediastore_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediastore_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error", "timeout"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record one external call.
pub fn record_external_call(service: &str, operation: &str, started: Instant, status: &str) {
    EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service, operation])
        .observe(started.elapsed().as_secs_f64());
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, status])
        .inc();
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sync
        Box::new(SYNC_PASSES.clone()),
        Box::new(SYNC_DURATION.clone()),
        Box::new(SYNC_FILES.clone()),
        // Purchases
        Box::new(PURCHASES_INITIATED.clone()),
        Box::new(PURCHASES_CONFIRMED.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}

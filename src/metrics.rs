// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the labels-injector.
//!
//! All metrics use the namespace prefix `labels_injector_`.
//!
//! # Metrics Categories
//!
//! - **Intercept Metrics** - Outcomes and latency of binding admission requests
//! - **Sweep Metrics** - Runs, duration and per-run pod counts of the convergence sweep
//! - **Store Metrics** - Patches submitted and store errors, per propagation path
//!
//! # Example
//!
//! ```rust,no_run
//! use labels_injector::metrics::{gather_metrics, record_pod_patched, PATH_INTERCEPT};
//!
//! record_pod_patched(PATH_INTERCEPT);
//! let text = gather_metrics().unwrap();
//! ```

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "labels_injector";

/// `path` label value for the binding intercept
pub const PATH_INTERCEPT: &str = "intercept";

/// `path` label value for the convergence sweep
pub const PATH_SWEEP: &str = "sweep";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Intercept Metrics
// ============================================================================

/// Total number of binding admission requests by outcome
///
/// Labels:
/// - `outcome`: `patched`, `unchanged`, `ignored`, `skipped`, `patch_failed`, `timeout`
pub static INTERCEPTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_intercepts_total"),
        "Total number of binding admission requests by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of binding intercepts in seconds
///
/// Labels:
/// - `outcome`: Same values as [`INTERCEPTS_TOTAL`]
pub static INTERCEPT_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_intercept_duration_seconds"),
        "Duration of binding intercepts in seconds by outcome",
    )
    .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]);
    let histogram = HistogramVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Store Metrics
// ============================================================================

/// Total number of pod label patches accepted by the store
///
/// Labels:
/// - `path`: `intercept` or `sweep`
pub static PODS_PATCHED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_pods_patched_total"),
        "Total number of pod label patches accepted by the store",
    );
    let counter = CounterVec::new(opts, &["path"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of store errors by path and error category
///
/// Labels:
/// - `path`: `intercept` or `sweep`
/// - `error_type`: `not_found`, `conflict`, `transport`
pub static STORE_ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_store_errors_total"),
        "Total number of resource store errors by path and error category",
    );
    let counter = CounterVec::new(opts, &["path", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Sweep Metrics
// ============================================================================

/// Total number of convergence sweeps by status
///
/// Labels:
/// - `status`: `success`, `error`, `cancelled`
pub static SWEEPS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_sweeps_total"),
        "Total number of convergence sweeps by status",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of convergence sweeps in seconds
pub static SWEEP_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_sweep_duration_seconds"),
        "Duration of convergence sweeps in seconds by status",
    )
    .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0]);
    let histogram = HistogramVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Pod counts of the most recent successful sweep
///
/// Labels:
/// - `result`: `listed`, `patched`, `unchanged`, `skipped`, `conflicts`
pub static LAST_SWEEP_PODS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_last_sweep_pods"),
        "Pod counts of the most recent successful convergence sweep",
    );
    let gauge = GaugeVec::new(opts, &["result"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record the outcome of a binding intercept
pub fn record_intercept(outcome: &str, duration: Duration) {
    INTERCEPTS_TOTAL.with_label_values(&[outcome]).inc();
    INTERCEPT_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration.as_secs_f64());
}

/// Record a pod label patch accepted by the store
pub fn record_pod_patched(path: &str) {
    PODS_PATCHED_TOTAL.with_label_values(&[path]).inc();
}

/// Record a store error
pub fn record_store_error(path: &str, error_type: &str) {
    STORE_ERRORS_TOTAL
        .with_label_values(&[path, error_type])
        .inc();
}

/// Record a finished convergence sweep
pub fn record_sweep(status: &str, duration: Duration) {
    SWEEPS_TOTAL.with_label_values(&[status]).inc();
    SWEEP_DURATION_SECONDS
        .with_label_values(&[status])
        .observe(duration.as_secs_f64());
}

/// Publish the pod counts of a successful sweep
#[allow(clippy::cast_precision_loss)]
pub fn record_sweep_counts(
    listed: usize,
    patched: usize,
    unchanged: usize,
    skipped: usize,
    conflicts: usize,
) {
    for (result, count) in [
        ("listed", listed),
        ("patched", patched),
        ("unchanged", unchanged),
        ("skipped", skipped),
        ("conflicts", conflicts),
    ] {
        LAST_SWEEP_PODS
            .with_label_values(&[result])
            .set(count as f64);
    }
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

//! Prometheus metrics for the command-line runner.
//!
//! Registers the core scan metrics plus run-level ones, and renders them in
//! the text exposition format.

use once_cell::sync::Lazy;
use prometheus::{self, Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Runs total by outcome.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("aspiratv_runs_total", "Total runs"),
        &["result"], // "success", "partial", "cancelled"
    )
    .unwrap()
});

/// Download targets emitted by the last run.
pub static TARGETS_EMITTED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "aspiratv_targets_emitted",
        "Download targets emitted by the last run",
    )
    .unwrap()
});

/// Episodes skipped because a file already exists in the destination.
pub static ALREADY_DOWNLOADED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "aspiratv_already_downloaded",
        "Accepted episodes already present on disk in the last run",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry.register(Box::new(RUNS_TOTAL.clone())).unwrap();
    registry.register(Box::new(TARGETS_EMITTED.clone())).unwrap();
    registry
        .register(Box::new(ALREADY_DOWNLOADED.clone()))
        .unwrap();

    // Core metrics (scan, merge, resolution)
    for metric in aspiratv_core::metrics::all_metrics() {
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

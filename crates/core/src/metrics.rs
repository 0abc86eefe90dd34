//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Scanning (shows discovered per provider, provider failures, durations)
//! - Merging (accepted, duplicate and unmatched shows)
//! - Resolution (stream URL failures)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Scan Metrics
// =============================================================================

/// Shows emitted by providers, before routing.
pub static SHOWS_DISCOVERED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "aspiratv_shows_discovered_total",
            "Total shows emitted by providers",
        ),
        &["provider"],
    )
    .unwrap()
});

/// Provider scans that ended with an error.
pub static SCAN_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("aspiratv_scan_errors_total", "Total failed provider scans"),
        &["provider"],
    )
    .unwrap()
});

/// Whole scan duration in seconds.
pub static SCAN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("aspiratv_scan_duration_seconds", "Duration of scan runs")
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
    )
    .unwrap()
});

/// Per-provider scan duration in seconds.
pub static PROVIDER_SCAN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "aspiratv_provider_scan_duration_seconds",
            "Duration of a single provider scan",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["provider", "result"], // result: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Merge Metrics
// =============================================================================

/// Shows accepted, by destination.
pub static SHOWS_ACCEPTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("aspiratv_shows_accepted_total", "Total shows accepted"),
        &["destination"],
    )
    .unwrap()
});

/// Shows dropped as duplicates of an already accepted episode.
pub static DUPLICATES_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "aspiratv_duplicates_skipped_total",
        "Total duplicate shows skipped",
    )
    .unwrap()
});

/// Shows matching no watch-list entry.
pub static UNMATCHED_SHOWS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "aspiratv_unmatched_shows_total",
            "Total shows matching no watch-list entry",
        ),
        &["provider"],
    )
    .unwrap()
});

// =============================================================================
// Resolution Metrics
// =============================================================================

/// Stream URL resolutions that failed.
pub static RESOLUTION_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "aspiratv_resolution_failures_total",
            "Total failed stream URL resolutions",
        ),
        &["provider"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Scan
        Box::new(SHOWS_DISCOVERED.clone()),
        Box::new(SCAN_ERRORS.clone()),
        Box::new(SCAN_DURATION.clone()),
        Box::new(PROVIDER_SCAN_DURATION.clone()),
        // Merge
        Box::new(SHOWS_ACCEPTED.clone()),
        Box::new(DUPLICATES_SKIPPED.clone()),
        Box::new(UNMATCHED_SHOWS.clone()),
        // Resolution
        Box::new(RESOLUTION_FAILURES.clone()),
    ]
}

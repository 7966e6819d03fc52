// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Listing pages and listing failures per store
//! - Replication outcomes, bytes and latency
//! - Final session summary
//!
//! The library only emits through the `metrics` facade; installing a
//! recorder (and exporter) is up to the embedding application. Without one,
//! every call here is a no-op.
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `object_sync_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration, size)

use crate::stats::StatsSnapshot;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record one listing page fetched from a store.
pub fn record_listing_page(store: &str, objects: usize, duration: Duration) {
    counter!("object_sync_listing_pages_total", "store" => store.to_string()).increment(1);
    counter!("object_sync_listed_objects_total", "store" => store.to_string())
        .increment(objects as u64);
    histogram!("object_sync_listing_page_duration_seconds", "store" => store.to_string())
        .record(duration.as_secs_f64());
}

/// Record a listing that stopped early.
///
/// `kind` is `"failed"` for a page error, `"out_of_order"` for an ordering violation.
pub fn record_listing_failure(store: &str, kind: &str) {
    counter!(
        "object_sync_listing_failures_total",
        "store" => store.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a successful replication.
///
/// `outcome` is `"in_memory"`, `"spilled"` or `"vanished"`.
pub fn record_object_replicated(outcome: &str, bytes: u64, duration: Duration) {
    counter!("object_sync_objects_replicated_total", "outcome" => outcome.to_string()).increment(1);
    counter!("object_sync_bytes_copied_total").increment(bytes);
    histogram!("object_sync_replication_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

/// Record a failed replication.
pub fn record_replication_failure(duration: Duration) {
    counter!("object_sync_replication_failures_total").increment(1);
    histogram!("object_sync_replication_duration_seconds", "outcome" => "failed")
        .record(duration.as_secs_f64());
}

/// Record the final counters of a session.
pub fn record_sync_complete(stats: &StatsSnapshot, duration: Duration) {
    counter!("object_sync_runs_total").increment(1);
    gauge!("object_sync_last_run_found").set(stats.found as f64);
    gauge!("object_sync_last_run_missing").set(stats.missing as f64);
    gauge!("object_sync_last_run_copied").set(stats.copied as f64);
    gauge!("object_sync_last_run_failed").set(stats.failed as f64);
    gauge!("object_sync_last_run_pending").set(stats.pending() as f64);
    histogram!("object_sync_run_duration_seconds").record(duration.as_secs_f64());
}

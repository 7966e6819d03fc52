// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Session statistics.
//!
//! Counters live on a [`SyncStats`] owned by one sync session and shared by
//! `Arc` between the diff engine, the workers and the progress reporter.
//! They are only ever incremented, with relaxed atomics: readers get an
//! eventually consistent [`StatsSnapshot`], which is fine for reporting but
//! must not drive control flow.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters for one sync session.
#[derive(Debug, Default)]
pub struct SyncStats {
    found: AtomicU64,
    missing: AtomicU64,
    copied: AtomicU64,
    failed: AtomicU64,
    vanished: AtomicU64,
    bytes_copied: AtomicU64,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source object was observed.
    pub fn record_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    /// A source object was found absent at the destination and enqueued.
    pub fn record_missing(&self) {
        self.missing.fetch_add(1, Ordering::Relaxed);
    }

    /// An object was replicated (or vanished at the source, which also counts).
    pub fn record_copied(&self, bytes: u64) {
        self.copied.fetch_add(1, Ordering::Relaxed);
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
    }

    /// The object was gone from the source by the time we read it.
    pub fn record_vanished(&self) {
        self.vanished.fetch_add(1, Ordering::Relaxed);
    }

    /// Replication of an object failed.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            found: self.found.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            vanished: self.vanished.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub found: u64,
    pub missing: u64,
    pub copied: u64,
    pub failed: u64,
    pub vanished: u64,
    pub bytes_copied: u64,
}

impl StatsSnapshot {
    /// Objects already present at the destination.
    pub fn present(&self) -> u64 {
        self.found.saturating_sub(self.missing)
    }

    /// Objects enqueued but not yet finished.
    pub fn pending(&self) -> u64 {
        self.missing
            .saturating_sub(self.copied)
            .saturating_sub(self.failed)
    }
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync session orchestration.
//!
//! Wires the pieces together for one run:
//!
//! ```text
//!  ┌────────────┐   ┌────────────┐
//!  │ listing    │   │ listing    │        producer task per store
//!  │ (source)   │   │ (dest)     │
//!  └─────┬──────┘   └─────┬──────┘
//!        └────────┬───────┘
//!                 ▼
//!          ┌─────────────┐
//!          │ DiffEngine  │ ─── found / missing
//!          └──────┬──────┘
//!                 ▼ bounded queue
//!          ┌─────────────┐
//!          │ worker × N  │ ─── copied / failed
//!          └─────────────┘
//! ```
//!
//! # Errors
//!
//! [`Syncer::run()`] returns `Err` for an invalid config, a listing that
//! cannot be set up, and an ordering violation. Everything else (mid-stream
//! listing failures, per-object failures) only shows up in the summary.

use crate::config::SyncConfig;
use crate::diff::{DiffEngine, DiffOutcome};
use crate::error::Result;
use crate::listing::ListingStream;
use crate::metrics;
use crate::pool::ReplicationPool;
use crate::progress::ProgressReporter;
use crate::replicate::Replicator;
use crate::shutdown::{self, Shutdown, ShutdownHandle};
use crate::stats::{StatsSnapshot, SyncStats};
use crate::store::StoreRef;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, info_span, Instrument};

/// Final result of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub stats: StatsSnapshot,
    pub outcome: DiffOutcome,
    pub elapsed: Duration,
}

impl std::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "found: {}, copied: {}, failed: {}",
            self.stats.found, self.stats.copied, self.stats.failed
        )
    }
}

/// One sync session from `source` into `destination`.
pub struct Syncer {
    source: StoreRef,
    destination: StoreRef,
    config: SyncConfig,
    stats: Arc<SyncStats>,
    shutdown_handle: ShutdownHandle,
    shutdown: Shutdown,
}

impl Syncer {
    pub fn new(source: StoreRef, destination: StoreRef, config: SyncConfig) -> Self {
        let (shutdown_handle, shutdown) = shutdown::channel();
        Self {
            source,
            destination,
            config,
            stats: Arc::new(SyncStats::new()),
            shutdown_handle,
            shutdown,
        }
    }

    /// Live counters of this session.
    pub fn stats(&self) -> Arc<SyncStats> {
        Arc::clone(&self.stats)
    }

    /// Handle that cancels this session.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown_handle.clone()
    }

    /// Run the session to completion.
    pub async fn run(self) -> Result<SyncSummary> {
        let span = info_span!(
            "sync",
            source = %self.source.name(),
            destination = %self.destination.name()
        );
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> Result<SyncSummary> {
        self.config.validate()?;
        let started = Instant::now();
        info!(
            marker = %self.config.marker,
            end = ?self.config.end_bound(),
            threads = self.config.threads,
            "Starting sync"
        );

        let end = self.config.end_bound();
        let mut source = ListingStream::open(
            Arc::clone(&self.source),
            &self.config.marker,
            end,
            self.config.page_size,
            self.shutdown.clone(),
        )
        .await?;
        let mut destination = ListingStream::open(
            Arc::clone(&self.destination),
            &self.config.marker,
            end,
            self.config.page_size,
            self.shutdown.clone(),
        )
        .await?;

        let (queue_tx, queue_rx) = mpsc::channel(self.config.queue_capacity);
        let replicator = Arc::new(Replicator::new(
            Arc::clone(&self.source),
            Arc::clone(&self.destination),
            self.config.spill_threshold,
        ));
        let pool = ReplicationPool::spawn(
            self.config.threads,
            replicator,
            queue_rx,
            Arc::clone(&self.stats),
            self.shutdown.clone(),
        );

        let reporter = self.config.progress.enabled.then(|| {
            let stats = Arc::clone(&self.stats);
            ProgressReporter::start(move || stats.snapshot(), &self.config.progress)
        });

        let mut diff = DiffEngine::new(Arc::clone(&self.stats), self.shutdown.clone());
        let diffed = diff.run(&mut source, &mut destination, queue_tx).await;
        drop(source);
        drop(destination);

        let outcome = match diffed {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Sync aborted");
                self.shutdown_handle.trigger();
                if let Err(join_err) = pool.join().await {
                    error!(error = %join_err, "Workers did not stop cleanly");
                }
                if let Some(reporter) = reporter {
                    reporter.stop().await;
                }
                return Err(e);
            }
        };

        let joined = pool.join().await;
        if let Some(reporter) = reporter {
            reporter.stop().await;
        }
        joined?;

        let summary = SyncSummary {
            stats: self.stats.snapshot(),
            outcome,
            elapsed: started.elapsed(),
        };
        metrics::record_sync_complete(&summary.stats, summary.elapsed);
        info!(
            found = summary.stats.found,
            missing = summary.stats.missing,
            copied = summary.stats.copied,
            failed = summary.stats.failed,
            vanished = summary.stats.vanished,
            pending = summary.stats.pending(),
            bytes = summary.stats.bytes_copied,
            outcome = %summary.outcome,
            elapsed = %humantime::format_duration(truncate_millis(summary.elapsed)),
            "{summary}"
        );
        Ok(summary)
    }
}

fn truncate_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}

/// Sync `source` into `destination` with `config`.
pub async fn sync(source: StoreRef, destination: StoreRef, config: SyncConfig) -> Result<SyncSummary> {
    Syncer::new(source, destination, config).run().await
}

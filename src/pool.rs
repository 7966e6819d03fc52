// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fixed-size pool of replication workers.
//!
//! All workers pull from one bounded queue filled by the diff engine. A
//! worker exits when the queue is closed and drained, or on shutdown. A
//! failed object is logged and counted, never retried, and never stops the
//! pool.

use crate::error::{Result, SyncError};
use crate::metrics;
use crate::replicate::{Replicated, Replicator};
use crate::shutdown::Shutdown;
use crate::stats::SyncStats;
use crate::store::ObjectRecord;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

/// Handle to the running workers.
pub struct ReplicationPool {
    workers: Vec<JoinHandle<()>>,
}

impl ReplicationPool {
    /// Spawn `workers` tasks draining `queue`.
    pub fn spawn(
        workers: usize,
        replicator: Arc<Replicator>,
        queue: mpsc::Receiver<ObjectRecord>,
        stats: Arc<SyncStats>,
        shutdown: Shutdown,
    ) -> Self {
        let queue = Arc::new(Mutex::new(queue));
        let workers = (0..workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    replicator: Arc::clone(&replicator),
                    queue: Arc::clone(&queue),
                    stats: Arc::clone(&stats),
                    shutdown: shutdown.clone(),
                };
                tokio::spawn(worker.run().instrument(tracing::debug_span!("worker", id)))
            })
            .collect();
        Self { workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Wait for every worker to exit.
    ///
    /// Returns an error if a worker panicked; the remaining workers are
    /// still awaited first.
    pub async fn join(self) -> Result<()> {
        let mut panicked = 0usize;
        for handle in self.workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "Replication worker terminated abnormally");
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(SyncError::Internal(format!("{panicked} replication worker(s) panicked")));
        }
        Ok(())
    }
}

struct Worker {
    id: usize,
    replicator: Arc<Replicator>,
    queue: Arc<Mutex<mpsc::Receiver<ObjectRecord>>>,
    stats: Arc<SyncStats>,
    shutdown: Shutdown,
}

impl Worker {
    async fn run(mut self) {
        let mut handled = 0u64;
        while let Some(obj) = self.next().await {
            self.handle(&obj).await;
            handled += 1;
        }
        debug!(worker = self.id, handled, "Worker finished");
    }

    /// Next queued object, or `None` once the queue is closed and drained
    /// or shutdown was requested.
    async fn next(&mut self) -> Option<ObjectRecord> {
        if self.shutdown.is_requested() {
            return None;
        }
        let mut queue = tokio::select! {
            biased;
            _ = self.shutdown.requested() => return None,
            queue = self.queue.lock() => queue,
        };
        tokio::select! {
            biased;
            _ = self.shutdown.requested() => None,
            obj = queue.recv() => obj,
        }
    }

    async fn handle(&self, obj: &ObjectRecord) {
        let start = Instant::now();
        match self.replicator.replicate(obj).await {
            Ok(outcome) => {
                let elapsed = start.elapsed();
                if outcome == Replicated::Vanished {
                    info!(key = %obj.key, "Object vanished from source, skipping");
                    self.stats.record_vanished();
                }
                self.stats.record_copied(outcome.bytes());
                metrics::record_object_replicated(outcome.as_str(), outcome.bytes(), elapsed);
                debug!(
                    key = %obj.key,
                    bytes = outcome.bytes(),
                    outcome = outcome.as_str(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Replicated object"
                );
            }
            Err(e) => {
                let elapsed = start.elapsed();
                warn!(key = %obj.key, error = %e, "Replication failed");
                self.stats.record_failed();
                metrics::record_replication_failure(elapsed);
            }
        }
    }
}

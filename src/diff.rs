// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Merge-join diff of two ordered listings.
//!
//! Walks the source listing once and advances the destination listing only
//! as far as the current source key, so memory stays constant however many
//! keys either side has.
//!
//! ```text
//! source:  a   b   c   e         dst cursor   emitted
//!          │                     ""  → b      a  (a < b)
//!              │                 b            -  (present)
//!                  │             b  → d       c  (c < d)
//!                      │         d  → end     e  (dst exhausted)
//! destination:  b   d
//! ```
//!
//! An exact key match means "present": this is an existence diff, content
//! is never compared.
//!
//! # Incomplete Listings
//!
//! - Source listing fails: stop consuming, close the queue, let queued work
//!   finish.
//! - Destination listing fails: absence can no longer be disproved, so stop
//!   the same way rather than copying everything that follows.
//! - Either side out of order: return the fatal error.

use crate::error::{Result, SyncError};
use crate::listing::{ListingEvent, ListingStream};
use crate::shutdown::Shutdown;
use crate::stats::SyncStats;
use crate::store::ObjectRecord;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// How the diff pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiffOutcome {
    /// The source listing was fully consumed.
    Complete,
    /// The source listing failed; the tail of the source was never seen.
    SourceFailed,
    /// The destination listing failed; the rest of the source was abandoned.
    DestinationFailed,
    /// Shutdown was requested.
    Cancelled,
}

impl DiffOutcome {
    /// Whether every source key in range was considered.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for DiffOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffOutcome::Complete => write!(f, "complete"),
            DiffOutcome::SourceFailed => write!(f, "source listing failed"),
            DiffOutcome::DestinationFailed => write!(f, "destination listing failed"),
            DiffOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Computes `source - destination` into the work queue.
pub struct DiffEngine {
    stats: Arc<SyncStats>,
    shutdown: Shutdown,
}

/// Where the destination cursor stands after advancing.
enum Advance {
    Ready,
    Failed,
    Cancelled,
}

impl DiffEngine {
    pub fn new(stats: Arc<SyncStats>, shutdown: Shutdown) -> Self {
        Self { stats, shutdown }
    }

    /// Run the merge-join to completion.
    ///
    /// Every source record counts towards `found`; every enqueued record
    /// towards `missing`. The queue is closed when this returns, whatever
    /// the outcome, so workers drain what was already queued and exit.
    pub async fn run(
        &mut self,
        source: &mut ListingStream,
        destination: &mut ListingStream,
        queue: mpsc::Sender<ObjectRecord>,
    ) -> Result<DiffOutcome> {
        let mut dst_key = String::new();
        let mut has_more = true;

        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.requested() => return Ok(self.cancelled()),
                event = source.next() => event,
            };

            let obj = match event {
                ListingEvent::Object(obj) => obj,
                ListingEvent::End => {
                    debug!(store = %source.store(), "Source listing complete");
                    return Ok(DiffOutcome::Complete);
                }
                ListingEvent::Failed(e) if e.is_fatal() => return Err(e.into()),
                ListingEvent::Failed(e) => {
                    error!(error = %e, "Listing failed, stop replicating, waiting for pending ones");
                    return Ok(DiffOutcome::SourceFailed);
                }
            };
            self.stats.record_found();

            while has_more && obj.key > dst_key {
                match self.advance(destination, &mut dst_key, &mut has_more).await? {
                    Advance::Ready => {}
                    Advance::Failed => return Ok(DiffOutcome::DestinationFailed),
                    Advance::Cancelled => return Ok(self.cancelled()),
                }
            }

            if obj.key < dst_key || !has_more {
                let sent = tokio::select! {
                    biased;
                    _ = self.shutdown.requested() => None,
                    sent = queue.send(obj) => Some(sent),
                };
                match sent {
                    Some(Ok(())) => self.stats.record_missing(),
                    Some(Err(_)) => {
                        return Err(SyncError::Internal("work queue closed before diff finished".into()))
                    }
                    None => return Ok(self.cancelled()),
                }
            }
        }
    }

    /// Pull one destination event and move the cursor.
    async fn advance(
        &mut self,
        destination: &mut ListingStream,
        dst_key: &mut String,
        has_more: &mut bool,
    ) -> Result<Advance> {
        let event = tokio::select! {
            biased;
            _ = self.shutdown.requested() => return Ok(Advance::Cancelled),
            event = destination.next() => event,
        };
        match event {
            ListingEvent::Object(dst) => *dst_key = dst.key,
            ListingEvent::End => {
                debug!(store = %destination.store(), "Destination listing complete");
                *has_more = false;
            }
            ListingEvent::Failed(e) if e.is_fatal() => return Err(e.into()),
            ListingEvent::Failed(e) => {
                error!(error = %e, "Listing failed, stop replicating, waiting for pending ones");
                return Ok(Advance::Failed);
            }
        }
        Ok(Advance::Ready)
    }

    fn cancelled(&self) -> DiffOutcome {
        info!("Diff cancelled, waiting for pending ones");
        DiffOutcome::Cancelled
    }
}

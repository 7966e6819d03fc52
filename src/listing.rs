// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Ordered listing of one store.
//!
//! Turns a paginated `list(prefix, marker, limit)` API into a single ordered,
//! single-pass stream of [`ObjectRecord`]s, fed by a producer task.
//!
//! # Paging
//!
//! ```text
//! list("", marker, N) ──▶ check order ──▶ emit ──▶ list("", last, N) ──▶ ...
//!                                                        │
//!                                  empty page / key >= end / error ──▶ stop
//! ```
//!
//! The channel between producer and consumer holds one page, so listing
//! runs at most one page ahead of the diff.
//!
//! # Failure Signalling
//!
//! The stream yields a tagged [`ListingEvent`]:
//!
//! - `Object(record)`: next record, strictly after the previous one
//! - `End`: the store was fully enumerated (within the requested range)
//! - `Failed(error)`: enumeration stopped early; nothing further is known
//!
//! A failed page request is not an error for the session; it only means the
//! listing is incomplete. An ordering violation is different: the merge-join
//! would be wrong, so [`ListingError::is_fatal()`] is `true`.
//!
//! # Ordering Check
//!
//! Every non-empty key must sort strictly after the last emitted key
//! (initially the marker). The empty key stands for a store-specific prefix
//! placeholder: it is exempt and does not move the cursor. Each page is
//! checked in full before any of its records is emitted.

use crate::error::{ListingError, Result, SyncError};
use crate::metrics;
use crate::shutdown::Shutdown;
use crate::store::{ObjectRecord, StoreRef};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, Instrument};

/// What travels through a listing channel.
pub type ListingItem = std::result::Result<ObjectRecord, ListingError>;

/// One step of a listing stream.
#[derive(Debug)]
pub enum ListingEvent {
    /// The next record in key order.
    Object(ObjectRecord),
    /// Enumeration finished normally.
    End,
    /// Enumeration stopped early.
    Failed(ListingError),
}

/// Check that `page` continues strictly after `last`.
pub fn check_page_order(
    store: &str,
    last: &str,
    page: &[ObjectRecord],
) -> std::result::Result<(), ListingError> {
    let mut last = last;
    for obj in page {
        if obj.key.is_empty() {
            continue;
        }
        if obj.key.as_str() <= last {
            return Err(ListingError::OutOfOrder {
                store: store.to_string(),
                last: last.to_string(),
                key: obj.key.clone(),
            });
        }
        last = &obj.key;
    }
    Ok(())
}

/// Ordered, single-pass stream over one store's listing.
///
/// Dropping the stream stops its producer.
pub struct ListingStream {
    store: String,
    rx: mpsc::Receiver<ListingItem>,
    producer: Option<JoinHandle<()>>,
}

impl ListingStream {
    /// Start listing `store` over `(marker, end)`.
    ///
    /// The first page is fetched and order-checked before returning, so a
    /// store that cannot be listed at all, or whose first page is unsorted,
    /// fails here and nothing downstream starts.
    pub async fn open(
        store: StoreRef,
        marker: &str,
        end: Option<&str>,
        page_size: usize,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let name = store.name().to_string();

        let started = Instant::now();
        let first = match store.list("", marker, page_size).await {
            Ok(page) => page,
            Err(source) => {
                error!(store = %name, error = %source, "Can't list store");
                metrics::record_listing_failure(&name, "failed");
                return Err(SyncError::ListingSetup { store: name, source });
            }
        };
        metrics::record_listing_page(&name, first.len(), started.elapsed());

        if let Err(e) = check_page_order(&name, marker, &first) {
            error!(store = %name, error = %e, "Listing out of order");
            metrics::record_listing_failure(&name, "out_of_order");
            return Err(e.into());
        }

        let (tx, rx) = mpsc::channel(page_size);
        let producer = Producer {
            store,
            name: name.clone(),
            end: end.map(str::to_string),
            page_size,
            tx,
            shutdown,
        };
        let span = info_span!("listing", store = %name);
        let handle = tokio::spawn(producer.run(first, marker.to_string()).instrument(span));

        Ok(Self {
            store: name,
            rx,
            producer: Some(handle),
        })
    }

    /// Wrap an existing channel; the sender side is responsible for ordering.
    pub fn from_receiver(store: impl Into<String>, rx: mpsc::Receiver<ListingItem>) -> Self {
        Self {
            store: store.into(),
            rx,
            producer: None,
        }
    }

    /// Display name of the listed store.
    pub fn store(&self) -> &str {
        &self.store
    }

    /// Wait for the next event. Returns `End` forever once exhausted.
    pub async fn next(&mut self) -> ListingEvent {
        match self.rx.recv().await {
            Some(Ok(obj)) => ListingEvent::Object(obj),
            Some(Err(e)) => ListingEvent::Failed(e),
            None => ListingEvent::End,
        }
    }
}

impl Drop for ListingStream {
    fn drop(&mut self) {
        if let Some(handle) = self.producer.take() {
            handle.abort();
        }
    }
}

/// Producer side of one listing.
struct Producer {
    store: StoreRef,
    name: String,
    end: Option<String>,
    page_size: usize,
    tx: mpsc::Sender<ListingItem>,
    shutdown: Shutdown,
}

impl Producer {
    async fn run(mut self, first: Vec<ObjectRecord>, marker: String) {
        let mut page = first;
        let mut last = marker;
        let mut emitted = 0u64;

        loop {
            if page.is_empty() {
                debug!(emitted, "Listing exhausted");
                return;
            }

            for obj in page {
                if let Some(end) = self.end.as_deref() {
                    if obj.key.as_str() >= end {
                        debug!(emitted, end = %end, "Listing reached end bound");
                        return;
                    }
                }
                let next_last = (!obj.key.is_empty()).then(|| obj.key.clone());
                if !self.send(Ok(obj)).await {
                    return;
                }
                emitted += 1;
                if let Some(key) = next_last {
                    last = key;
                }
            }

            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = self.shutdown.requested() => {
                    debug!(marker = %last, "Listing cancelled");
                    return;
                }
                result = self.store.list("", &last, self.page_size) => result,
            };

            page = match result {
                Ok(next) => next,
                Err(source) => {
                    error!(marker = %last, error = %source, "Failed to list after marker");
                    metrics::record_listing_failure(&self.name, "failed");
                    let failure = ListingError::Store {
                        store: self.name.clone(),
                        marker: last,
                        source,
                    };
                    self.send(Err(failure)).await;
                    return;
                }
            };
            metrics::record_listing_page(&self.name, page.len(), started.elapsed());

            if let Err(e) = check_page_order(&self.name, &last, &page) {
                error!(error = %e, "Listing out of order");
                metrics::record_listing_failure(&self.name, "out_of_order");
                self.send(Err(e)).await;
                return;
            }
        }
    }

    /// Returns `false` once the consumer is gone or shutdown was requested.
    async fn send(&mut self, item: ListingItem) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.requested() => false,
            sent = self.tx.send(item) => sent.is_ok(),
        }
    }
}

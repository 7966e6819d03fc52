// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Object Sync
//!
//! One-way replication of a key-addressed object store into another,
//! copying only the objects missing at the destination.
//!
//! ## Architecture
//!
//! No index is kept on either side. The set of missing keys is derived from
//! two independently paginated, sorted listings, merge-joined in a single
//! forward pass:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                               object-sync                                 │
//! │                                                                           │
//! │  ┌───────────────┐                                                        │
//! │  │ ListingStream │──┐                                                     │
//! │  │ (source)      │  │   ┌────────────┐  queue  ┌────────────────────────┐ │
//! │  └───────────────┘  ├──►│ DiffEngine │───────►│ ReplicationPool (× N)  │ │
//! │  ┌───────────────┐  │   │ merge-join │ (1024)  │ Replicator: memory or  │ │
//! │  │ ListingStream │──┘   └────────────┘         │ temp-file spill        │ │
//! │  │ (destination) │                             └────────────────────────┘ │
//! │  └───────────────┘                                                        │
//! │                     SyncStats (atomic) ◄── ProgressReporter (optional)   │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Memory stays bounded: each listing runs at most one page ahead, the work
//! queue is bounded, and objects above the spill threshold are staged
//! through an anonymous temp file.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use object_sync::{sync, MemoryStore, SyncConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = MemoryStore::new("source");
//!     source.insert("a", b"hello".to_vec()).await;
//!     let destination = MemoryStore::new("destination");
//!
//!     let summary = sync(Arc::new(source), Arc::new(destination), SyncConfig::default())
//!         .await
//!         .expect("sync failed");
//!     println!("{summary}");
//! }
//! ```

pub mod config;
pub mod diff;
pub mod error;
pub mod listing;
pub mod metrics;
pub mod pool;
pub mod progress;
pub mod replicate;
pub mod shutdown;
pub mod stats;
pub mod store;
pub mod sync;

// Re-exports for convenience
pub use config::{ProgressConfig, SyncConfig};
pub use diff::{DiffEngine, DiffOutcome};
pub use error::{ListingError, Result, StoreError, SyncError};
pub use listing::{ListingEvent, ListingStream};
pub use pool::ReplicationPool;
pub use progress::ProgressReporter;
pub use replicate::{Replicated, Replicator};
pub use shutdown::{Shutdown, ShutdownHandle};
pub use stats::{StatsSnapshot, SyncStats};
pub use store::{LocalFsStore, MemoryStore, ObjectRecord, ObjectStore, StoreRef};
pub use sync::{sync, SyncSummary, Syncer};

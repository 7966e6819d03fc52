// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Object store integration trait.
//!
//! Defines the narrow interface the sync engine needs from a key-addressed
//! object store: paginated sorted listing, ranged reads, whole-object writes
//! and an existence check.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStore`]: `BTreeMap` backed, for tests and embedding.
//! - [`LocalFsStore`]: a directory tree on the local filesystem.
//!
//! # Example
//!
//! ```rust,no_run
//! use object_sync::store::{BoxFuture, ObjectReader, ObjectRecord, ObjectStore};
//!
//! struct MyBackend { /* ... */ }
//!
//! impl ObjectStore for MyBackend {
//!     fn name(&self) -> &str {
//!         "my://bucket"
//!     }
//!
//!     fn list<'a>(&'a self, _prefix: &'a str, _marker: &'a str, _limit: usize) -> BoxFuture<'a, Vec<ObjectRecord>> {
//!         Box::pin(async move { Ok(Vec::new()) })
//!     }
//!
//!     fn read<'a>(&'a self, _key: &'a str, _offset: u64, _length: Option<u64>) -> BoxFuture<'a, ObjectReader> {
//!         Box::pin(async move { Ok(Box::pin(std::io::Cursor::new(Vec::new())) as ObjectReader) })
//!     }
//!
//!     fn write<'a>(&'a self, _key: &'a str, _body: ObjectReader) -> BoxFuture<'a, ()> {
//!         Box::pin(async move { Ok(()) })
//!     }
//!
//!     fn exists<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, bool> {
//!         Box::pin(async move { Ok(false) })
//!     }
//! }
//! ```

pub mod fs;
pub mod memory;

pub use fs::LocalFsStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Result type for object store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Type alias for boxed async futures (keeps the trait object-safe).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// A streamed object body.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Shared handle to a store, as passed between sync components.
pub type StoreRef = Arc<dyn ObjectStore>;

/// One listed object: a point-in-time observation, not a live reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Unique key, ordered byte-lexicographically.
    pub key: String,
    /// Size in bytes at listing time.
    pub size: u64,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Trait defining what we need from an object store.
///
/// Implementations must return listings sorted ascending by key and
/// resuming strictly after the marker. The engine checks this at runtime
/// and treats a violation as fatal.
pub trait ObjectStore: Send + Sync + 'static {
    /// Display name used in log lines and errors.
    fn name(&self) -> &str;

    /// List up to `limit` objects whose key starts with `prefix` and sorts
    /// strictly after `marker`, in ascending key order.
    fn list<'a>(
        &'a self,
        prefix: &'a str,
        marker: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Vec<ObjectRecord>>;

    /// Open a ranged read. `length = None` reads to the end of the object.
    fn read<'a>(
        &'a self,
        key: &'a str,
        offset: u64,
        length: Option<u64>,
    ) -> BoxFuture<'a, ObjectReader>;

    /// Replace the object at `key` with the full contents of `body`.
    fn write<'a>(&'a self, key: &'a str, body: ObjectReader) -> BoxFuture<'a, ()>;

    /// Check whether `key` exists.
    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, bool>;
}

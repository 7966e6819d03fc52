// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for object sync.
//!
//! Errors are split by layer:
//!
//! - [`StoreError`]: what an [`ObjectStore`](crate::store::ObjectStore) backend reports.
//! - [`ListingError`]: carried through a listing stream in place of a record.
//! - [`SyncError`]: what the engine reports to its caller.
//!
//! # Error Categories
//!
//! | Error Type | Fatal | Description |
//! |------------|-------|-------------|
//! | `Config` | No | Configuration invalid, nothing started |
//! | `ListingSetup` | No | First page of a listing could not be fetched |
//! | `OutOfOrder` | Yes | A listing returned keys out of order |
//! | `Object` | No | Reading or writing one object failed |
//! | `Spill` | No | Local temp file for a large object failed |
//! | `Internal` | No | Unexpected internal error |
//!
//! # Fatal Errors
//!
//! The merge-join is only correct on strictly sorted input. An ordering
//! violation means the diff can no longer be trusted, so
//! [`SyncError::is_fatal()`] is `true` and the caller is expected to stop
//! the process rather than report a partial result.

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors reported by an object store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The object does not exist.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The key cannot be represented by this backend.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// I/O error while talking to the backend or streaming a body.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    /// Check if this error means the object is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Why a listing stream stopped early.
#[derive(Error, Debug)]
pub enum ListingError {
    /// A page request failed after the listing was set up.
    ///
    /// Enumeration is incomplete; nothing further is known about the store.
    #[error("Failed to list {store} after {marker:?}: {source}")]
    Store {
        store: String,
        marker: String,
        #[source]
        source: StoreError,
    },

    /// A page presented a key that does not sort after the previous one.
    #[error("Keys out of order in {store}: {last:?} >= {key:?}")]
    OutOfOrder {
        store: String,
        last: String,
        key: String,
    },
}

impl ListingError {
    /// Ordering violations invalidate the diff; page failures only truncate it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfOrder { .. })
    }
}

/// Errors that can occur during a sync.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Invalid configuration.
    ///
    /// Occurs before any listing starts. Fix the configuration and rerun.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The first page of a listing could not be fetched.
    ///
    /// The only steady-state store failure returned to the caller; nothing
    /// has been replicated yet.
    #[error("Can't list {store}: {source}")]
    ListingSetup {
        store: String,
        #[source]
        source: StoreError,
    },

    /// A listing returned keys out of order.
    ///
    /// Fatal: the merge-join would silently produce a wrong diff.
    #[error("Keys out of order in {store}: {last:?} >= {key:?}")]
    OutOfOrder {
        store: String,
        last: String,
        key: String,
    },

    /// Reading or writing a single object failed.
    #[error("Failed to {operation} {key} on {store}: {source}")]
    Object {
        store: String,
        key: String,
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// The temp file used to spill a large object failed.
    #[error("Spill file error for {key}: {source}")]
    Spill {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Create an object error for a failed store operation.
    pub fn object(
        store: impl Into<String>,
        key: impl Into<String>,
        operation: &'static str,
        source: impl Into<StoreError>,
    ) -> Self {
        Self::Object {
            store: store.into(),
            key: key.into(),
            operation,
            source: source.into(),
        }
    }

    /// Create a spill error for a temp file failure.
    pub fn spill(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spill {
            key: key.into(),
            source,
        }
    }

    /// Check if this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfOrder { .. })
    }
}

impl From<ListingError> for SyncError {
    fn from(e: ListingError) -> Self {
        match e {
            ListingError::OutOfOrder { store, last, key } => Self::OutOfOrder { store, last, key },
            ListingError::Store { store, source, .. } => Self::ListingSetup { store, source },
        }
    }
}

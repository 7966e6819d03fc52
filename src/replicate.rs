// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Copy one object from source to destination.
//!
//! # Paths
//!
//! ```text
//! size <= threshold   read [0, end) ──► memory ──► write
//!
//! size >  threshold   read [0, threshold) ──► memory ─┐
//!                     read [threshold, end) ──────────┼─► temp file ──► write
//! ```
//!
//! The spill file comes from [`tempfile::tempfile()`]: it is unlinked as
//! soon as it is created, so the OS reclaims it when the handle drops, on
//! every exit path including a crash.
//!
//! # Vanished Objects
//!
//! A source object may be deleted between listing and replication. When the
//! first read fails we ask the source whether the key still exists; a
//! definite "no" is reported as [`Replicated::Vanished`], not as a failure.

use crate::error::{Result, StoreError, SyncError};
use crate::store::{ObjectReader, ObjectRecord, StoreRef};
use std::io::{Cursor, SeekFrom};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};

/// Chunk size when streaming an object tail into the spill file.
const SPILL_CHUNK: usize = 64 * 1024;

/// What a successful replication did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replicated {
    /// Buffered in memory and written.
    InMemory { bytes: u64 },
    /// Staged through a temp file and written.
    Spilled { bytes: u64 },
    /// Gone from the source by the time it was read. Nothing written.
    Vanished,
}

impl Replicated {
    /// Bytes written to the destination.
    pub fn bytes(&self) -> u64 {
        match self {
            Replicated::InMemory { bytes } | Replicated::Spilled { bytes } => *bytes,
            Replicated::Vanished => 0,
        }
    }

    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Replicated::InMemory { .. } => "in_memory",
            Replicated::Spilled { .. } => "spilled",
            Replicated::Vanished => "vanished",
        }
    }
}

/// Copies objects between two stores.
///
/// Stateless between calls; cheap to share behind an `Arc` across workers.
pub struct Replicator {
    source: StoreRef,
    destination: StoreRef,
    spill_threshold: u64,
}

impl Replicator {
    pub fn new(source: StoreRef, destination: StoreRef, spill_threshold: u64) -> Self {
        Self {
            source,
            destination,
            spill_threshold,
        }
    }

    /// Replicate one object. Safe to repeat for the same key.
    #[instrument(skip(self, obj), fields(key = %obj.key, size = obj.size))]
    pub async fn replicate(&self, obj: &ObjectRecord) -> Result<Replicated> {
        if obj.size > self.spill_threshold {
            self.replicate_spilled(obj).await
        } else {
            self.replicate_in_memory(obj).await
        }
    }

    async fn replicate_in_memory(&self, obj: &ObjectRecord) -> Result<Replicated> {
        let body = match self.read_head(&obj.key, None).await {
            Ok(body) => body,
            Err(e) => return self.vanished_or(&obj.key, e).await,
        };

        let bytes = body.len() as u64;
        self.upload(&obj.key, Box::pin(Cursor::new(body))).await?;
        Ok(Replicated::InMemory { bytes })
    }

    async fn replicate_spilled(&self, obj: &ObjectRecord) -> Result<Replicated> {
        let head = match self.read_head(&obj.key, Some(self.spill_threshold)).await {
            Ok(head) => head,
            Err(e) => return self.vanished_or(&obj.key, e).await,
        };
        debug!(key = %obj.key, size = obj.size, "Spilling large object to temp file");

        let spill = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(|e| SyncError::Internal(format!("spill file task failed: {e}")))?
            .map_err(|e| SyncError::spill(&obj.key, e))?;
        let mut file = tokio::fs::File::from_std(spill);

        file.write_all(&head)
            .await
            .map_err(|e| SyncError::spill(&obj.key, e))?;
        let head_len = head.len() as u64;
        drop(head);

        let mut tail = self
            .source
            .read(&obj.key, head_len, None)
            .await
            .map_err(|e| SyncError::object(self.source.name(), &obj.key, "read", e))?;
        let tail_len = spill_tail(self.source.name(), &obj.key, &mut tail, &mut file).await?;

        file.flush().await.map_err(|e| SyncError::spill(&obj.key, e))?;
        file.seek(SeekFrom::Start(0))
            .await
            .map_err(|e| SyncError::spill(&obj.key, e))?;

        self.upload(&obj.key, Box::pin(file)).await?;
        Ok(Replicated::Spilled {
            bytes: head_len + tail_len,
        })
    }

    /// First read of an object: open and buffer up to `limit` bytes.
    async fn read_head(&self, key: &str, limit: Option<u64>) -> std::result::Result<Vec<u8>, StoreError> {
        let mut reader = self.source.read(key, 0, limit).await?;
        let mut buf = Vec::with_capacity(limit.unwrap_or(0).min(1 << 20) as usize);
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn upload(&self, key: &str, body: ObjectReader) -> Result<()> {
        self.destination
            .write(key, body)
            .await
            .map_err(|e| SyncError::object(self.destination.name(), key, "write", e))
    }

    /// Decide whether a failed first read means the object is gone.
    async fn vanished_or(&self, key: &str, read_err: StoreError) -> Result<Replicated> {
        match self.source.exists(key).await {
            Ok(false) => {
                debug!(key, error = %read_err, "Object vanished from source");
                Ok(Replicated::Vanished)
            }
            Ok(true) => Err(SyncError::object(self.source.name(), key, "read", read_err)),
            Err(e) => {
                debug!(key, error = %e, "Existence check failed");
                Err(SyncError::object(self.source.name(), key, "read", read_err))
            }
        }
    }
}

/// Stream `tail` into the spill file. Read failures belong to the source
/// store, write failures to the spill file.
async fn spill_tail<R, W>(store: &str, key: &str, tail: &mut R, file: &mut W) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; SPILL_CHUNK];
    let mut total = 0u64;
    loop {
        let n = tail
            .read(&mut buf)
            .await
            .map_err(|e| SyncError::object(store, key, "read", e))?;
        if n == 0 {
            return Ok(total);
        }
        file.write_all(&buf[..n])
            .await
            .map_err(|e| SyncError::spill(key, e))?;
        total += n as u64;
    }
}

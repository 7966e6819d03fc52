//! Shared test utilities for integration and chaos tests.
//!
//! This module provides:
//! - `FaultyStore`, a fault-injecting `ObjectStore` wrapper
//! - Store seeding helpers
//! - `LogCapture`, an in-memory log sink for asserting on emitted events

pub mod mock_store;

pub use mock_store::*;

use object_sync::MemoryStore;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Deterministic body for a key, `size` bytes long.
#[allow(dead_code)]
pub fn body_for(key: &str, size: usize) -> Vec<u8> {
    key.bytes().cycle().take(size).collect()
}

/// A memory store holding `keys`, each with a small body derived from its key.
#[allow(dead_code)]
pub async fn memory_store(label: &str, keys: &[&str]) -> MemoryStore {
    let store = MemoryStore::new(label);
    for key in keys {
        store.insert(*key, body_for(key, 16)).await;
    }
    store
}

/// Collects formatted log lines emitted on the current thread.
///
/// Only events from the installing thread are captured, so use it from a
/// current-thread runtime (the `#[tokio::test]` default).
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl LogCapture {
    /// Route this thread's events here until the guard is dropped.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Lines at `level` (e.g. `"ERROR"`) containing `needle`.
    pub fn lines_with(&self, level: &str, needle: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(level) && line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

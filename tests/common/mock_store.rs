//! Fault-injecting ObjectStore for testing.
//!
//! Wraps a `MemoryStore` and records every read and write. Faults are
//! configured up front with the builder methods:
//! - listing fails after N successful pages
//! - listing returns scripted pages (e.g. out of order)
//! - reads or writes of given keys fail
//! - objects vanish just before being read

use object_sync::store::{BoxFuture, ObjectReader, ObjectRecord, ObjectStore};
use object_sync::{MemoryStore, StoreError};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A recorded read() call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCall {
    pub key: String,
    pub offset: u64,
    pub length: Option<u64>,
}

/// Mock store that delegates to a `MemoryStore` unless told to fail.
///
/// # Example
/// ```rust,ignore
/// let store = FaultyStore::new(inner).fail_list_after(1).fail_writes(&["b"]);
/// // Use in a sync...
/// assert_eq!(store.reads_of("a").len(), 1);
/// ```
pub struct FaultyStore {
    inner: MemoryStore,
    name: String,
    /// Successful list() calls before every further one fails
    fail_list_after: Option<usize>,
    list_calls: AtomicUsize,
    /// Pages returned instead of the inner store's listing
    scripted_pages: Mutex<Option<VecDeque<Vec<ObjectRecord>>>>,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
    vanishing: HashSet<String>,
    reads: Mutex<Vec<ReadCall>>,
    writes: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        let name = format!("faulty+{}", inner.name());
        Self {
            inner,
            name,
            fail_list_after: None,
            list_calls: AtomicUsize::new(0),
            scripted_pages: Mutex::new(None),
            failing_reads: HashSet::new(),
            failing_writes: HashSet::new(),
            vanishing: HashSet::new(),
            reads: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Serve `pages` successful list() calls, then fail every later one.
    pub fn fail_list_after(mut self, pages: usize) -> Self {
        self.fail_list_after = Some(pages);
        self
    }

    /// Return these pages verbatim, one per list() call, then empty pages.
    pub fn with_pages(self, pages: Vec<Vec<&str>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| page.into_iter().map(|k| ObjectRecord::new(k, 16)).collect())
            .collect();
        *self.scripted_pages.lock().unwrap() = Some(pages);
        self
    }

    pub fn fail_reads(mut self, keys: &[&str]) -> Self {
        self.failing_reads.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn fail_writes(mut self, keys: &[&str]) -> Self {
        self.failing_writes.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Delete these keys from the inner store right before they are read.
    pub fn vanish_on_read(mut self, keys: &[&str]) -> Self {
        self.vanishing.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> Vec<ReadCall> {
        self.reads.lock().unwrap().clone()
    }

    pub fn reads_of(&self, key: &str) -> Vec<ReadCall> {
        self.reads().into_iter().filter(|r| r.key == key).collect()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl ObjectStore for FaultyStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list<'a>(
        &'a self,
        prefix: &'a str,
        marker: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Vec<ObjectRecord>> {
        Box::pin(async move {
            let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
            if matches!(self.fail_list_after, Some(n) if call >= n) {
                return Err(StoreError::Backend(format!("injected list failure after {marker:?}")));
            }
            let scripted = self
                .scripted_pages
                .lock()
                .unwrap()
                .as_mut()
                .map(|pages| pages.pop_front().unwrap_or_default());
            match scripted {
                Some(page) => Ok(page),
                None => self.inner.list(prefix, marker, limit).await,
            }
        })
    }

    fn read<'a>(&'a self, key: &'a str, offset: u64, length: Option<u64>) -> BoxFuture<'a, ObjectReader> {
        Box::pin(async move {
            self.reads.lock().unwrap().push(ReadCall {
                key: key.to_string(),
                offset,
                length,
            });
            if self.failing_reads.contains(key) {
                return Err(StoreError::Backend(format!("injected read failure for {key}")));
            }
            if self.vanishing.contains(key) {
                self.inner.remove(key).await;
            }
            self.inner.read(key, offset, length).await
        })
    }

    fn write<'a>(&'a self, key: &'a str, body: ObjectReader) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.writes.lock().unwrap().push(key.to_string());
            if self.failing_writes.contains(key) {
                return Err(StoreError::Backend(format!("injected write failure for {key}")));
            }
            self.inner.write(key, body).await
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, bool> {
        self.inner.exists(key)
    }
}

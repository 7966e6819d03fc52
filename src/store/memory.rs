// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory object store for tests and embedding.

use super::{BoxFuture, ObjectReader, ObjectRecord, ObjectStore};
use crate::error::StoreError;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::ops::Bound;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

/// `BTreeMap` backed object store.
///
/// Clones share the same contents, so a test can hand one clone to the
/// engine and inspect the other.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    name: String,
    objects: Arc<RwLock<BTreeMap<String, Arc<Vec<u8>>>>>,
}

impl MemoryStore {
    /// Create an empty store named `memory://{label}`.
    pub fn new(label: &str) -> Self {
        Self {
            name: format!("memory://{}", label),
            objects: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Insert or replace an object directly.
    pub async fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .await
            .insert(key.into(), Arc::new(data.into()));
    }

    /// Remove an object directly. Returns `true` if it existed.
    pub async fn remove(&self, key: &str) -> bool {
        self.objects.write().await.remove(key).is_some()
    }

    /// Fetch an object's contents.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).map(|d| d.as_ref().clone())
    }

    /// All keys in order.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl ObjectStore for MemoryStore {
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
            let objects = self.objects.read().await;
            let start = Bound::Excluded(marker.to_string());
            Ok(objects
                .range((start, Bound::Unbounded))
                .filter(|(k, _)| k.starts_with(prefix))
                .take(limit)
                .map(|(k, v)| ObjectRecord::new(k.clone(), v.len() as u64))
                .collect())
        })
    }

    fn read<'a>(
        &'a self,
        key: &'a str,
        offset: u64,
        length: Option<u64>,
    ) -> BoxFuture<'a, ObjectReader> {
        Box::pin(async move {
            let data = self
                .objects
                .read()
                .await
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

            let size = data.len() as u64;
            let start = offset.min(size);
            let end = match length {
                Some(len) => start.saturating_add(len).min(size),
                None => size,
            };
            let slice = data[start as usize..end as usize].to_vec();
            Ok(Box::pin(Cursor::new(slice)) as ObjectReader)
        })
    }

    fn write<'a>(&'a self, key: &'a str, mut body: ObjectReader) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut data = Vec::new();
            body.read_to_end(&mut data).await?;
            self.objects
                .write()
                .await
                .insert(key.to_string(), Arc::new(data));
            Ok(())
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { Ok(self.objects.read().await.contains_key(key)) })
    }
}

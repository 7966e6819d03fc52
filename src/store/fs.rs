// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local filesystem object store.
//!
//! Keys are `/`-separated paths relative to the store root. Writes land in a
//! temp file next to the target and are renamed into place, so a reader
//! never observes a partially written object.
//!
//! # Listing
//!
//! The tree is walked in key order: siblings are sorted by name, with a
//! directory compared as `name/`, so `a.txt` comes before everything under
//! `a/`. Directories whose keys all sort at or before the marker are never
//! descended, and a page stops as soon as it holds `limit` records.
//!
//! The walk behind the last page is kept, so asking for the page that
//! starts right after it resumes instead of walking from the root again.
//! Symlinks are followed; loops and dangling links are skipped with a
//! warning.

use super::{BoxFuture, ObjectReader, ObjectRecord, ObjectStore, StoreResult};
use crate::error::StoreError;
use std::cmp::Ordering;
use std::fmt;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Prefix of in-flight write files; never listed.
const TMP_PREFIX: &str = ".object-sync-tmp";

type Walk = Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>;

/// Walk left off after the record keyed `last`.
struct Cursor {
    prefix: String,
    last: String,
    walk: Walk,
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("prefix", &self.prefix)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

/// Directory tree backed object store.
#[derive(Debug, Clone)]
pub struct LocalFsStore {
    root: PathBuf,
    name: String,
    resume: Arc<Mutex<Option<Cursor>>>,
}

impl LocalFsStore {
    /// Open an existing directory. Listing fails if it does not exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = format!("file://{}", root.display());
        Self {
            root,
            name,
            resume: Arc::new(Mutex::new(None)),
        }
    }

    /// Open a directory, creating it if needed.
    pub async fn create(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self::new(root);
        tokio::fs::create_dir_all(&store.root).await?;
        Ok(store)
    }

    /// Map a key to a path under the root, rejecting anything that could escape it.
    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.contains('\\') {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(StoreError::InvalidKey(key.to_string()));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

fn not_found_as(key: &str, e: std::io::Error) -> StoreError {
    if e.kind() == ErrorKind::NotFound {
        StoreError::NotFound(key.to_string())
    } else {
        StoreError::Io(e)
    }
}

/// Key of `path` relative to `root`, or `None` for the root itself and
/// for paths that are not valid UTF-8.
fn key_for(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut key = String::new();
    for part in relative.components() {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(part.as_os_str().to_str()?);
    }
    (!key.is_empty()).then_some(key)
}

/// Name an entry sorts by among its siblings.
fn sort_name(entry: &DirEntry) -> String {
    let mut name = entry.file_name().to_string_lossy().into_owned();
    let file_type = entry.file_type();
    // Sorting happens before links are followed.
    if file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir()) {
        name.push('/');
    }
    name
}

fn key_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    sort_name(a).cmp(&sort_name(b))
}

/// Whether the walk should yield `entry` (and descend into it, for a directory).
fn worth_visiting(root: &Path, entry: &DirEntry, prefix: &str, marker: &str) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with(TMP_PREFIX))
    {
        return false;
    }
    let Some(key) = key_for(root, entry.path()) else {
        warn!(path = %entry.path().display(), "Skipping non UTF-8 path");
        return false;
    };
    if !entry.file_type().is_dir() {
        return key.as_str() > marker && key.starts_with(prefix);
    }

    let dir = format!("{}/", key);
    let after_marker = marker < dir.as_str() || marker.starts_with(&dir);
    let overlaps_prefix = dir.starts_with(prefix) || prefix.starts_with(&dir);
    after_marker && overlaps_prefix
}

/// Start a key-ordered walk of `root` that skips what sorts at or before `marker`.
fn walk_from(root: &Path, prefix: &str, marker: &str) -> Walk {
    let base = root.to_path_buf();
    let prefix = prefix.to_string();
    let marker = marker.to_string();
    let walk = WalkDir::new(root)
        .follow_links(true)
        .sort_by(key_order)
        .into_iter()
        .filter_entry(move |entry| worth_visiting(&base, entry, &prefix, &marker));
    Box::new(walk)
}

/// One page pulled off a walk.
#[derive(Debug, Default)]
struct Page {
    objects: Vec<ObjectRecord>,
    /// Entries the walk yielded to fill this page.
    visited: usize,
    /// The walk ran out.
    exhausted: bool,
}

/// Pull up to `limit` records keyed after `marker` and under `prefix` off `walk`.
fn scan(root: &Path, walk: &mut Walk, prefix: &str, marker: &str, limit: usize) -> std::io::Result<Page> {
    let mut page = Page::default();
    while page.objects.len() < limit {
        let Some(entry) = walk.next() else {
            page.exhausted = true;
            break;
        };
        page.visited += 1;

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() > 0 && skippable(&e) => {
                warn!(path = ?e.path(), error = %e, "Skipping unreadable entry");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(key) = key_for(root, entry.path()) else {
            continue;
        };
        if key.as_str() <= marker || !key.starts_with(prefix) {
            continue;
        }

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => {
                debug!(key = %key, "File removed while listing");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        page.objects.push(ObjectRecord::new(key, size));
    }
    Ok(page)
}

/// Symlink loops and links to nothing.
fn skippable(e: &walkdir::Error) -> bool {
    e.loop_ancestor().is_some() || e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound)
}

impl ObjectStore for LocalFsStore {
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
            let cursor = self
                .resume
                .lock()
                .await
                .take()
                .filter(|c| c.prefix == prefix && c.last == marker);
            let resumed = cursor.is_some();

            let root = self.root.clone();
            let (owned_prefix, owned_marker) = (prefix.to_string(), marker.to_string());
            let (page, cursor) = tokio::task::spawn_blocking(move || {
                let mut walk = match cursor {
                    Some(cursor) => cursor.walk,
                    None => walk_from(&root, &owned_prefix, &owned_marker),
                };
                let page = scan(&root, &mut walk, &owned_prefix, &owned_marker, limit)?;
                let cursor = match page.objects.last() {
                    Some(last) if !page.exhausted => Some(Cursor {
                        prefix: owned_prefix,
                        last: last.key.clone(),
                        walk,
                    }),
                    _ => None,
                };
                Ok::<_, StoreError>((page, cursor))
            })
            .await
            .map_err(|e| StoreError::Backend(format!("listing task failed: {}", e)))??;

            *self.resume.lock().await = cursor;
            debug!(
                store = %self.name,
                marker,
                resumed,
                returned = page.objects.len(),
                visited = page.visited,
                "Listed directory page"
            );
            Ok(page.objects)
        })
    }

    fn read<'a>(
        &'a self,
        key: &'a str,
        offset: u64,
        length: Option<u64>,
    ) -> BoxFuture<'a, ObjectReader> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            let mut file = tokio::fs::File::open(&path)
                .await
                .map_err(|e| not_found_as(key, e))?;
            if offset > 0 {
                file.seek(SeekFrom::Start(offset)).await?;
            }
            Ok(match length {
                Some(len) => Box::pin(file.take(len)) as ObjectReader,
                None => Box::pin(file) as ObjectReader,
            })
        })
    }

    fn write<'a>(&'a self, key: &'a str, mut body: ObjectReader) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            let parent = path
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StoreError::InvalidKey(key.to_string()))?;
            tokio::fs::create_dir_all(&parent).await?;

            let tmp = tokio::task::spawn_blocking(move || {
                tempfile::Builder::new().prefix(TMP_PREFIX).tempfile_in(&parent)
            })
            .await
            .map_err(|e| StoreError::Backend(format!("temp file task failed: {}", e)))??;

            // Dropping tmp_path on any early return deletes the partial file.
            let (file, tmp_path) = tmp.into_parts();
            let mut file = tokio::fs::File::from_std(file);
            let written = tokio::io::copy(&mut body, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);

            tmp_path.persist(&path).map_err(|e| StoreError::Io(e.error))?;
            debug!(key = %key, bytes = written, "Wrote object");
            Ok(())
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            match tokio::fs::metadata(&path).await {
                Ok(meta) => Ok(meta.is_file()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }
}

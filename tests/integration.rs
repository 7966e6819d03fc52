// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! End-to-end sync tests over the bundled stores.
//!
//! Run with: cargo test --test integration

mod common;

use common::*;
use object_sync::{sync, DiffOutcome, LocalFsStore, MemoryStore, SyncConfig, Syncer};
use std::sync::Arc;
use tempfile::tempdir;

// =============================================================================
// Memory Stores
// =============================================================================

#[tokio::test]
async fn copies_only_missing_objects() {
    let src = memory_store("src", &["a", "b", "c"]).await;
    let dst = memory_store("dst", &["b"]).await;

    let summary = sync(Arc::new(src.clone()), Arc::new(dst.clone()), SyncConfig::default())
        .await
        .expect("sync failed");

    assert_eq!(summary.outcome, DiffOutcome::Complete);
    assert_eq!(summary.stats.found, 3);
    assert_eq!(summary.stats.missing, 2);
    assert_eq!(summary.stats.copied, 2);
    assert_eq!(summary.stats.failed, 0);
    assert_eq!(summary.to_string(), "found: 3, copied: 2, failed: 0");

    assert_eq!(dst.keys().await, src.keys().await);
    for key in ["a", "c"] {
        assert_eq!(dst.get(key).await, src.get(key).await);
    }
}

#[tokio::test]
async fn truncated_source_listing_still_copies_what_was_seen() {
    let logs = LogCapture::default();
    let _guard = logs.install();

    let inner = memory_store("src", &["a", "b"]).await;
    let src = FaultyStore::new(inner).fail_list_after(1);
    let dst = MemoryStore::new("dst");
    let config = SyncConfig {
        page_size: 1,
        ..SyncConfig::for_testing()
    };

    let summary = sync(Arc::new(src), Arc::new(dst.clone()), config)
        .await
        .expect("mid-stream listing failure must not be an error");

    assert_eq!(summary.outcome, DiffOutcome::SourceFailed);
    assert_eq!(summary.stats.found, 1);
    assert_eq!(summary.stats.missing, 1);
    assert_eq!(summary.stats.copied, 1);
    assert_eq!(dst.keys().await, vec!["a"]);

    let failed = logs.lines_with("ERROR", "Listing failed");
    assert_eq!(failed.len(), 1, "logs:\n{}", logs.contents());
    assert!(failed[0].contains("memory://src"), "{}", failed[0]);
    assert_eq!(logs.lines_with("ERROR", "Failed to list after marker").len(), 1);
}

#[tokio::test]
async fn paging_across_many_pages() {
    let keys: Vec<String> = (0..50).map(|i| format!("obj/{i:04}")).collect();
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let src = memory_store("src", &key_refs).await;
    // Every third object already present.
    let present: Vec<&str> = key_refs.iter().copied().step_by(3).collect();
    let dst = memory_store("dst", &present).await;

    let summary = sync(Arc::new(src.clone()), Arc::new(dst.clone()), SyncConfig::for_testing())
        .await
        .unwrap();

    assert_eq!(summary.stats.found, 50);
    assert_eq!(summary.stats.missing, 50 - present.len() as u64);
    assert_eq!(summary.stats.copied, summary.stats.missing);
    assert_eq!(dst.keys().await, src.keys().await);
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let src = memory_store("src", &["x", "y", "z"]).await;
    let dst = MemoryStore::new("dst");

    sync(Arc::new(src.clone()), Arc::new(dst.clone()), SyncConfig::for_testing())
        .await
        .unwrap();
    let again = sync(Arc::new(src), Arc::new(dst), SyncConfig::for_testing())
        .await
        .unwrap();

    assert_eq!(again.stats.found, 3);
    assert_eq!(again.stats.missing, 0);
    assert_eq!(again.stats.copied, 0);
}

#[tokio::test]
async fn large_objects_spill_and_arrive_intact() {
    let src = MemoryStore::new("src");
    let big = body_for("large-object", 10 * 1024 + 1);
    src.insert("big", big.clone()).await;
    src.insert("small", body_for("small", 100)).await;
    let src = FaultyStore::new(src);
    let dst = MemoryStore::new("dst");
    let src = Arc::new(src);

    let summary = sync(src.clone(), Arc::new(dst.clone()), SyncConfig::for_testing())
        .await
        .unwrap();

    assert_eq!(summary.stats.copied, 2);
    assert_eq!(summary.stats.bytes_copied, big.len() as u64 + 100);
    assert_eq!(dst.get("big").await.unwrap(), big);

    // Head read is bounded by the spill threshold, tail starts right after it.
    let threshold = SyncConfig::for_testing().spill_threshold;
    let reads = src.reads_of("big");
    assert_eq!(reads.len(), 2);
    assert_eq!((reads[0].offset, reads[0].length), (0, Some(threshold)));
    assert_eq!((reads[1].offset, reads[1].length), (threshold, None));

    // Small object: one read, one write.
    assert_eq!(src.reads_of("small").len(), 1);
}

// =============================================================================
// Local Filesystem Stores
// =============================================================================

#[tokio::test]
async fn local_fs_to_local_fs() {
    let src_dir = tempdir().unwrap();
    let dst_dir = tempdir().unwrap();

    for (rel, body) in [("a.txt", "alpha"), ("dir/b.txt", "beta"), ("dir/sub/c.txt", "gamma")] {
        let path = src_dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }
    std::fs::create_dir_all(dst_dir.path().join("dir")).unwrap();
    std::fs::write(dst_dir.path().join("dir/b.txt"), "stale but present").unwrap();

    let src = LocalFsStore::new(src_dir.path());
    let dst = LocalFsStore::create(dst_dir.path()).await.unwrap();
    let summary = sync(Arc::new(src), Arc::new(dst), SyncConfig::for_testing())
        .await
        .unwrap();

    assert_eq!(summary.stats.found, 3);
    assert_eq!(summary.stats.copied, 2);
    assert_eq!(std::fs::read_to_string(dst_dir.path().join("a.txt")).unwrap(), "alpha");
    assert_eq!(
        std::fs::read_to_string(dst_dir.path().join("dir/sub/c.txt")).unwrap(),
        "gamma"
    );
    // Existence diff: present objects are never overwritten.
    assert_eq!(
        std::fs::read_to_string(dst_dir.path().join("dir/b.txt")).unwrap(),
        "stale but present"
    );
}

#[tokio::test]
async fn memory_to_local_fs_with_spill() {
    let dst_dir = tempdir().unwrap();
    let src = MemoryStore::new("src");
    let big = body_for("spilled", 5000);
    src.insert("blobs/big.bin", big.clone()).await;

    let dst = LocalFsStore::create(dst_dir.path().join("mirror")).await.unwrap();
    let summary = sync(Arc::new(src), Arc::new(dst), SyncConfig::for_testing())
        .await
        .unwrap();

    assert_eq!(summary.stats.copied, 1);
    assert_eq!(std::fs::read(dst_dir.path().join("mirror/blobs/big.bin")).unwrap(), big);
}

// =============================================================================
// Session Control
// =============================================================================

#[tokio::test]
async fn stats_are_observable_while_running() {
    let src = memory_store("src", &["1", "2", "3", "4"]).await;
    let syncer = Syncer::new(
        Arc::new(src),
        Arc::new(MemoryStore::new("dst")),
        SyncConfig::for_testing(),
    );
    let stats = syncer.stats();
    assert_eq!(stats.snapshot().found, 0);

    let summary = syncer.run().await.unwrap();
    assert_eq!(stats.snapshot(), summary.stats);
}

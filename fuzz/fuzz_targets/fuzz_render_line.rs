//! Fuzz target for progress line rendering.
//!
//! Snapshots are read without synchronization, so any combination of
//! counters must render without panicking and keep the bar width.

#![no_main]

use libfuzzer_sys::fuzz_target;
use object_sync::progress::{render_line, LISTING_PLACEHOLDER};
use object_sync::StatsSnapshot;

fuzz_target!(|data: (u64, u64, u64, f64, u8)| {
    let (found, missing, copied, rate, width) = data;
    let width = width as usize + 1;
    let snap = StatsSnapshot {
        found,
        missing,
        copied,
        ..Default::default()
    };

    let line = render_line(&snap, rate, width);

    if found == 0 {
        assert_eq!(line, LISTING_PLACEHOLDER);
        return;
    }
    let close = line.find(']').expect("bar not closed");
    assert_eq!(line[1..close].chars().count(), width);
    assert!(line.ends_with(" per second"));
});

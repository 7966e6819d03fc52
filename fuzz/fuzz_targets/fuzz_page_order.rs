//! Fuzz target for the listing page order check.
//!
//! This tests that the check never panics on arbitrary pages and agrees
//! with a straightforward sortedness test.

#![no_main]

use libfuzzer_sys::fuzz_target;
use object_sync::listing::check_page_order;
use object_sync::store::ObjectRecord;

fuzz_target!(|data: (&str, Vec<&str>)| {
    let (marker, keys) = data;
    let page: Vec<ObjectRecord> = keys.iter().map(|k| ObjectRecord::new(*k, 0)).collect();

    let result = check_page_order("fuzz", marker, &page);

    // Reference: non-empty keys strictly increase starting after the marker.
    let mut last = marker;
    let mut sorted = true;
    for key in keys.iter().filter(|k| !k.is_empty()) {
        if *key <= last {
            sorted = false;
            break;
        }
        last = *key;
    }
    assert_eq!(result.is_ok(), sorted);
    if let Err(e) = result {
        assert!(e.is_fatal());
    }
});

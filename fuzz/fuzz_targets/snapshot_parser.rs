//! Fuzz target for the snapshot reader.
//!
//! Arbitrary bytes are parsed as snapshot documents. Parsing must never
//! panic, and anything that parses must serialize and parse back to the
//! same snapshot.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_snapshot_parser
//! ```

#![no_main]

use ddlkit_migrate::Snapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(snapshot) = Snapshot::from_json(input, "fuzz") else {
        return;
    };
    if let Ok(json) = snapshot.to_json() {
        let reparsed = Snapshot::from_json(&json, "fuzz").expect("written snapshot must parse");
        assert_eq!(reparsed, snapshot);
    }
});

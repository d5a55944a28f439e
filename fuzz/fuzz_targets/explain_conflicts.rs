//! Fuzz target for the branch conflict rules.
//!
//! Input is split on a NUL byte into two JSON statement lists. Whatever
//! deserializes is fed to `explain_conflicts`, which must not panic and must
//! flag the same number of pairs in either argument order.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_explain_conflicts
//! ```

#![no_main]

use ddlkit_migrate::{JsonStatement, explain_conflicts};
use libfuzzer_sys::fuzz_target;

fn statements(bytes: &[u8]) -> Vec<JsonStatement> {
    serde_json::from_slice(bytes).unwrap_or_default()
}

fuzz_target!(|data: &[u8]| {
    let mut parts = data.splitn(2, |b| *b == 0);
    let a = statements(parts.next().unwrap_or_default());
    let b = statements(parts.next().unwrap_or_default());

    let forward = explain_conflicts(&a, &b);
    let backward = explain_conflicts(&b, &a);
    assert_eq!(forward.len(), backward.len());
});

//! Fuzz target for expression and type normalization.
//!
//! Both functions run on catalog output and on hand-written schemas, so they
//! must accept any text and be idempotent.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_expression_normalizer
//! ```

#![no_main]

use ddlkit_migrate::ddl::{normalize_expression, normalize_type};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let expr = normalize_expression(input);
        assert_eq!(normalize_expression(&expr), expr);

        let sql_type = normalize_type(input);
        assert_eq!(normalize_type(&sql_type), sql_type);
    }
});

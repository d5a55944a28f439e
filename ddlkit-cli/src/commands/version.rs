//! `ddlkit version` command - Display version information.

use ddlkit_migrate::{Dialect, SNAPSHOT_VERSION};

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("ddlkit");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";
    kv("Build", build_mode);

    let mut features = Vec::new();
    #[cfg(feature = "postgres")]
    features.push("postgres");
    if features.is_empty() {
        features.push("none");
    }
    kv("Features", &features.join(", "));
    kv("Snapshot format", SNAPSHOT_VERSION);

    let dialects: Vec<&str> = Dialect::ALL.iter().map(Dialect::as_str).collect();
    kv("Dialects", &dialects.join(", "));

    output::newline();
    Ok(())
}

use anyhow::{Context, Result};
use std::path::Path;

use crate::{adapters, paths, state};

/// Verify one client against the lockfile and print the JSON report
///
/// Exits with status 1 when any mismatch is found.
pub fn run(client: &str, lockfile: &Path) -> Result<()> {
    let root = paths::project_root()?;
    let lock = state::require_lock(&paths::resolve(&root, lockfile))?;
    let adapter = adapters::get_adapter(client, &root)?;

    let report = super::verify_client(&adapter, &lock)?;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{json}");

    if !report.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}

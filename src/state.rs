use crate::paths;
use anyhow::{Context, Result};
use reconcile::{DEFAULT_HISTORY_KEEP, Lockfile, ProjectState, RunRecord};
use std::fs;
use std::path::Path;

// ============================================================================
// Run History
// ============================================================================

/// Load the project's run history, or a fresh one if missing or unreadable
pub fn load_history(root: &Path) -> ProjectState {
    let path = paths::state_file(root);
    let fresh = || ProjectState::new(Some(root.display().to_string()));

    if !path.exists() {
        log::debug!("State file does not exist, using default state");
        return fresh();
    }

    let parsed = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))
        .and_then(|content| {
            serde_json::from_str::<ProjectState>(&content)
                .with_context(|| format!("Failed to parse state file: {}", path.display()))
        });

    match parsed {
        Ok(state) => {
            log::debug!("Loaded state from {}", path.display());
            state
        }
        Err(e) => {
            log::warn!("{e:#}; starting a fresh history");
            fresh()
        }
    }
}

/// Save the project's run history
pub fn save_history(root: &Path, state: &ProjectState) -> Result<()> {
    let path = paths::state_file(root);
    let mut content =
        serde_json::to_string_pretty(state).context("Failed to serialize state to JSON")?;
    content.push('\n');
    paths::write_atomic(&path, &content)
}

/// Prepend runs to the history and save it
pub fn record_runs(root: &Path, runs: Vec<RunRecord>) -> Result<()> {
    if runs.is_empty() {
        return Ok(());
    }
    let mut state = load_history(root);
    for run in runs {
        state.push_run(run, DEFAULT_HISTORY_KEEP);
    }
    save_history(root, &state)
}

// ============================================================================
// Lockfile
// ============================================================================

/// Read a lockfile, `None` if it does not exist
pub fn read_lock(path: &Path) -> Result<Option<Lockfile>> {
    if !path.exists() {
        log::debug!("No lockfile at {}", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read lockfile: {}", path.display()))?;
    let lock = Lockfile::from_json(&content)
        .with_context(|| format!("Failed to load lockfile: {}", path.display()))?;
    log::debug!(
        "Loaded lockfile {} ({} entr(ies))",
        path.display(),
        lock.entries.len()
    );
    Ok(Some(lock))
}

/// Read a lockfile that must exist
pub fn require_lock(path: &Path) -> Result<Lockfile> {
    read_lock(path)?.with_context(|| format!("Lockfile not found: {}", path.display()))
}

/// Write a lockfile through a temporary file
pub fn write_lock(path: &Path, lock: &Lockfile) -> Result<()> {
    let content = lock.to_json_pretty().context("Failed to serialize lockfile")?;
    paths::write_atomic(path, &content)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reconcile::{ApplySummary, Descriptor, Intent, Scope, ScopeMode, build_lock};
    use std::collections::BTreeMap;

    fn run(client: &str) -> RunRecord {
        RunRecord {
            timestamp: Utc::now(),
            client: client.to_string(),
            requested_scope: Scope::Project,
            realized_scope: Scope::Project,
            mode: ScopeMode::Native,
            intent: Intent::Project,
            result: ApplySummary::default(),
            entries: BTreeMap::new(),
        }
    }

    #[test]
    fn test_history_round_trip_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        record_runs(dir.path(), vec![run("cursor")]).unwrap();
        record_runs(dir.path(), vec![run("claude-code")]).unwrap();

        let state = load_history(dir.path());
        assert_eq!(state.runs.len(), 2);
        assert_eq!(state.runs[0].client, "claude-code");
        assert!(paths::state_file(dir.path()).exists());
    }

    #[test]
    fn test_corrupt_history_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = paths::state_file(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let state = load_history(dir.path());
        assert!(state.runs.is_empty());
        assert_eq!(state.version, "1");
    }

    #[test]
    fn test_lock_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcpsync.lock.json");
        assert!(read_lock(&path).unwrap().is_none());

        let desired: reconcile::DesiredState = [("a".to_string(), Descriptor::http("https://a"))]
            .into_iter()
            .collect();
        let lock = build_lock(["claude-code"], &desired, Scope::Project);
        write_lock(&path, &lock).unwrap();

        assert_eq!(require_lock(&path).unwrap(), lock);
    }

    #[test]
    fn test_lock_with_unknown_version_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcpsync.lock.json");
        fs::write(&path, r#"{ "version": "2", "clients": [], "mcpServers": {} }"#).unwrap();
        assert!(read_lock(&path).is_err());
    }
}

//! Centralized path resolution for mcpsync
//!
//! # Environment Variables
//!
//! - `MCPSYNC_HOME` - Override the home directory client user files live under
//!
//! # Layout
//!
//! - Lockfile: `mcpsync.lock.json` next to the config file
//! - Run history: `.mcpsync/state.json` in the project root
//! - Client user files: relative to `home_dir()`

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable for the user home override
pub const ENV_HOME: &str = "MCPSYNC_HOME";

/// Directory holding per-project state
pub const STATE_DIR_NAME: &str = ".mcpsync";

/// Get the home directory used for user-scope client files
///
/// Priority:
/// 1. `MCPSYNC_HOME` env var
/// 2. Platform home directory
pub fn home_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_HOME) {
        let path = expand(&dir);
        log::debug!("Using home dir from {}: {}", ENV_HOME, path.display());
        return Ok(path);
    }

    dirs::home_dir().context("Could not determine home directory")
}

/// Get the project root (current working directory)
pub fn project_root() -> Result<PathBuf> {
    std::env::current_dir().context("Could not determine current directory")
}

/// Path of the run history file for a project
pub fn state_file(root: &Path) -> PathBuf {
    root.join(STATE_DIR_NAME).join("state.json")
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Expand a user-supplied path and anchor it at `base` if relative
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    let expanded = expand(&path.to_string_lossy());
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Sibling path with an extra extension, e.g. `a.json` -> `a.json.tmp`
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Write a file through `<path>.tmp` and rename it into place
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let tmp = with_suffix(path, "tmp");
    fs::write(&tmp, content)
        .with_context(|| format!("Failed to write temporary file: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// Uses unsafe env::set_var/remove_var; only call from tests that do
    /// not read the same variable concurrently.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_home_dir_env_override() {
        with_env_var(ENV_HOME, "/custom/home", || {
            assert_eq!(home_dir().unwrap(), PathBuf::from("/custom/home"));
        });
    }

    #[test]
    fn test_state_file_location() {
        assert_eq!(
            state_file(Path::new("/repo")),
            PathBuf::from("/repo/.mcpsync/state.json")
        );
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = Path::new("/repo");
        assert_eq!(
            resolve(base, Path::new("conf/mcpsync.json")),
            PathBuf::from("/repo/conf/mcpsync.json")
        );
        assert_eq!(resolve(base, Path::new("/etc/x.json")), PathBuf::from("/etc/x.json"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(
            with_suffix(Path::new("/a/.mcp.json"), "bak"),
            PathBuf::from("/a/.mcp.json.bak")
        );
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.json");
        write_atomic(&path, "{}\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
        assert!(!with_suffix(&path, "tmp").exists());
    }
}

use crate::paths;
use anyhow::{Context, Result};
use reconcile::{LOCKFILE_NAME, ServerConfig, SyncConfig};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file names searched in the project root, in order
pub const CONFIG_CANDIDATES: &[&str] = &[
    "mcpsync.json",
    "mcpsync.toml",
    ".mcpsync.json",
    ".mcpsync.toml",
];

/// Client used when neither the command line nor the config names one
pub const DEFAULT_CLIENT: &str = "claude-code";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Detect format from the file extension (JSON unless `.toml`)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// A config entry that cannot be turned into a descriptor
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("servers: empty server name")]
    EmptyName,

    #[error("servers.{name}.url: must not be empty")]
    EmptyUrl { name: String },

    #[error("servers.{name}.command: must not be empty")]
    EmptyCommand { name: String },
}

// ============================================================================
// Loading
// ============================================================================

/// A parsed config together with where it came from
#[derive(Debug)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: SyncConfig,
}

impl LoadedConfig {
    /// Directory containing the config file
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Lockfile path: explicit override, else next to the config
    pub fn lockfile_path(&self, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => paths::resolve(self.dir(), path),
            None => self.dir().join(LOCKFILE_NAME),
        }
    }

    /// Clients to act on: explicit list, else config, else the default
    pub fn clients(&self, explicit: &[String]) -> Vec<String> {
        select_clients(explicit, self.config.clients.as_deref())
    }
}

/// Pick clients from the command line, the config, or the default
pub fn select_clients(explicit: &[String], configured: Option<&[String]>) -> Vec<String> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }
    match configured {
        Some(list) if !list.is_empty() => list.to_vec(),
        _ => vec![DEFAULT_CLIENT.to_string()],
    }
}

/// Find the first config candidate in `root`
pub fn discover(root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Load and validate the config, from `explicit` or by discovery in `root`
pub fn load(explicit: Option<&Path>, root: &Path) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => paths::resolve(root, path),
        None => discover(root).with_context(|| {
            format!(
                "No config file found in {} (looked for {})",
                root.display(),
                CONFIG_CANDIDATES.join(", ")
            )
        })?,
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let config = parse(&content, ConfigFormat::from_path(&path))
        .with_context(|| format!("Invalid config format: {}", path.display()))?;
    validate(&config).with_context(|| format!("Invalid config: {}", path.display()))?;

    log::debug!(
        "Loaded config from {} ({} server(s))",
        path.display(),
        config.servers.len()
    );
    Ok(LoadedConfig { path, config })
}

/// Parse config text in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<SyncConfig> {
    let config = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(config)
}

/// Reject entries the desired-state builder cannot represent
pub fn validate(config: &SyncConfig) -> Result<(), ConfigError> {
    for (name, server) in &config.servers {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        match server {
            ServerConfig::Http(remote) | ServerConfig::Sse(remote) => {
                if remote.url.trim().is_empty() {
                    return Err(ConfigError::EmptyUrl { name: name.clone() });
                }
            }
            ServerConfig::Stdio(process) => {
                if process.command.trim().is_empty() {
                    return Err(ConfigError::EmptyCommand { name: name.clone() });
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_with_legacy_key() {
        let config = parse(
            r#"{ "version": "1", "mcp": { "fs": { "transport": "stdio", "command": "npx", "args": ["fs"] } } }"#,
            ConfigFormat::Json,
        )
        .unwrap();
        assert!(matches!(config.servers["fs"], ServerConfig::Stdio(_)));
    }

    #[test]
    fn test_parse_toml() {
        let config = parse(
            r#"
clients = ["cursor"]

[servers.docs]
transport = "http"
url = "https://docs.example.com/mcp"

[servers.docs.headers]
Authorization = "Bearer x"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.clients.as_deref(), Some(&["cursor".to_string()][..]));
        assert_eq!(config.servers["docs"].transport(), "http");
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let config =
            parse(r#"{ "servers": { "x": { "transport": "http", "url": " " } } }"#, ConfigFormat::Json)
                .unwrap();
        assert_eq!(
            validate(&config),
            Err(ConfigError::EmptyUrl { name: "x".into() })
        );
        assert_eq!(
            ConfigError::EmptyUrl { name: "x".into() }.to_string(),
            "servers.x.url: must not be empty"
        );

        let config =
            parse(r#"{ "servers": { "": { "transport": "stdio", "command": "a" } } }"#, ConfigFormat::Json)
                .unwrap();
        assert_eq!(validate(&config), Err(ConfigError::EmptyName));
    }

    #[test]
    fn test_discover_order_and_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".mcpsync.toml"), "[servers]\n").unwrap();
        fs::write(
            dir.path().join("mcpsync.json"),
            r#"{ "servers": { "a": { "transport": "sse", "url": "https://a" } } }"#,
        )
        .unwrap();

        assert_eq!(discover(dir.path()), Some(dir.path().join("mcpsync.json")));

        let loaded = load(None, dir.path()).unwrap();
        assert_eq!(loaded.config.servers.len(), 1);
        assert_eq!(loaded.lockfile_path(None), dir.path().join(LOCKFILE_NAME));
        assert_eq!(
            loaded.lockfile_path(Some(Path::new("custom.lock.json"))),
            dir.path().join("custom.lock.json")
        );
    }

    #[test]
    fn test_load_missing_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(None, dir.path()).unwrap_err();
        assert!(err.to_string().contains("No config file found"));
    }

    #[test]
    fn test_select_clients() {
        assert_eq!(select_clients(&[], None), [DEFAULT_CLIENT]);
        let configured = vec!["cursor".to_string()];
        assert_eq!(select_clients(&[], Some(&configured)), ["cursor"]);
        assert_eq!(
            select_clients(&["gemini-cli".into()], Some(&configured)),
            ["gemini-cli"]
        );
    }
}

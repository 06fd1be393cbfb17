//! Adapter for clients that keep registrations in a JSON settings file
//!
//! The registrations live in the top-level `mcpServers` object. Nested
//! `mcpServers` blocks (per-project sections of a user file) belong to other
//! projects and are never read or written. Everything else in the file is
//! preserved on write.

use crate::paths;
use crate::runner;
use anyhow::{Context, Result};
use reconcile::{AdapterCapabilities, ClientAdapter, CurrentState, Descriptor, PlanAction, Scope};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Key holding the registrations
pub const SERVERS_KEY: &str = "mcpServers";

/// How a client spells one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFormat {
    /// `{ "type": "http", "url": ... }`; a missing `type` is inferred
    Typed,
    /// `httpUrl` for HTTP, `url` for SSE, `command` for stdio
    Gemini,
}

/// Static description of one file-based client
#[derive(Debug)]
pub struct ClientSpec {
    pub id: &'static str,
    /// Executable looked up on PATH by `check_available`
    pub executable: &'static str,
    /// Project file, relative to the project root
    pub project_file: Option<&'static str>,
    /// User file, relative to the home directory
    pub user_file: &'static str,
    pub format: EntryFormat,
    pub capabilities: AdapterCapabilities,
}

pub struct JsonFileAdapter {
    spec: &'static ClientSpec,
    project_root: PathBuf,
    home: PathBuf,
}

impl JsonFileAdapter {
    pub fn new(spec: &'static ClientSpec, project_root: PathBuf, home: PathBuf) -> Self {
        Self {
            spec,
            project_root,
            home,
        }
    }

    /// Settings file backing a scope
    pub fn file_path(&self, scope: Scope) -> Option<PathBuf> {
        match scope {
            Scope::Project => self.spec.project_file.map(|f| self.project_root.join(f)),
            Scope::User => Some(self.home.join(self.spec.user_file)),
        }
    }

    fn require_path(&self, scope: Scope) -> Result<PathBuf> {
        self.file_path(scope)
            .with_context(|| format!("{} has no {scope} settings file", self.spec.id))
    }
}

impl ClientAdapter for JsonFileAdapter {
    fn id(&self) -> &str {
        self.spec.id
    }

    fn capabilities(&self) -> AdapterCapabilities {
        self.spec.capabilities
    }

    fn check_available(&self) -> bool {
        runner::command_exists(self.spec.executable)
    }

    fn source_path(&self, scope: Scope) -> Option<PathBuf> {
        self.file_path(scope)
    }

    fn read_current(&self, scope: Scope) -> Result<CurrentState> {
        let path = self.require_path(scope)?;
        let doc = match read_document(&path) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                log::debug!("{} does not exist, no {scope} servers", path.display());
                return Ok(CurrentState::empty());
            }
            Err(e) => {
                log::warn!("{e:#}; treating {scope} state as unknown");
                return Ok(CurrentState::Unknown);
            }
        };

        let servers = doc
            .get(SERVERS_KEY)
            .and_then(Value::as_object)
            .map(|map| decode_servers(self.spec.format, map))
            .unwrap_or_default();
        log::debug!(
            "Read {} {scope} server(s) from {}",
            servers.len(),
            path.display()
        );
        Ok(CurrentState::Known(servers))
    }

    fn apply_action(&self, action: &PlanAction, scope: Scope) -> Result<()> {
        let path = self.require_path(scope)?;
        let existing = read_document(&path)
            .with_context(|| format!("Refusing to overwrite {}", path.display()))?;
        let mut doc = existing
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let servers = servers_mut(&mut doc)
            .with_context(|| format!("{} has no editable {SERVERS_KEY} object", path.display()))?;
        match action {
            PlanAction::Remove { name } => {
                if servers.remove(name).is_none() {
                    log::debug!("{name} already absent from {}", path.display());
                    return Ok(());
                }
            }
            other => {
                let Some(server) = other.server() else {
                    return Ok(());
                };
                servers.insert(other.name().to_string(), encode_entry(self.spec.format, server));
            }
        }

        if let Some(previous) = &existing {
            let backup = paths::with_suffix(&path, "bak");
            paths::write_atomic(&backup, &to_pretty(previous)?)?;
        }
        paths::write_atomic(&path, &to_pretty(&doc)?)
    }
}

// ============================================================================
// Document Helpers
// ============================================================================

/// Read a JSON document; `Ok(None)` when the file does not exist
fn read_document(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let doc = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(Some(doc))
}

fn to_pretty(doc: &Value) -> Result<String> {
    let mut text = serde_json::to_string_pretty(doc)?;
    text.push('\n');
    Ok(text)
}

/// The top-level `mcpServers` object, created if absent
fn servers_mut(doc: &mut Value) -> Option<&mut Map<String, Value>> {
    doc.as_object_mut()?
        .entry(SERVERS_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
}

// ============================================================================
// Entry Mapping
// ============================================================================

fn decode_servers(format: EntryFormat, map: &Map<String, Value>) -> reconcile::ServerMap {
    map.iter()
        .filter_map(|(name, entry)| match decode_entry(format, entry) {
            Some(descriptor) => Some((name.clone(), descriptor)),
            None => {
                log::debug!("Ignoring unrecognized entry '{name}'");
                None
            }
        })
        .collect()
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_map(obj: &Map<String, Value>, key: &str) -> Option<BTreeMap<String, String>> {
    let map = obj.get(key)?.as_object()?;
    Some(
        map.iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect(),
    )
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let list = obj.get(key)?.as_array()?;
    Some(
        list.iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
    )
}

fn stdio_entry(obj: &Map<String, Value>) -> Option<Descriptor> {
    Some(Descriptor::Stdio {
        command: string_field(obj, "command")?,
        args: string_list(obj, "args"),
        env: string_map(obj, "env"),
    })
}

/// Parse one client entry into a descriptor
pub fn decode_entry(format: EntryFormat, entry: &Value) -> Option<Descriptor> {
    let obj = entry.as_object()?;
    let descriptor = match format {
        EntryFormat::Typed => match obj.get("type").and_then(Value::as_str) {
            Some(_) => serde_json::from_value(entry.clone()).ok()?,
            None if obj.contains_key("command") => stdio_entry(obj)?,
            None => Descriptor::Http {
                url: string_field(obj, "url")?,
                headers: string_map(obj, "headers"),
            },
        },
        EntryFormat::Gemini => {
            if let Some(url) = string_field(obj, "httpUrl") {
                Descriptor::Http {
                    url,
                    headers: string_map(obj, "headers"),
                }
            } else if let Some(url) = string_field(obj, "url") {
                Descriptor::StreamEvents {
                    url,
                    headers: string_map(obj, "headers"),
                }
            } else {
                stdio_entry(obj)?
            }
        }
    };
    Some(descriptor.normalized())
}

/// Render a descriptor the way the client spells it
pub fn encode_entry(format: EntryFormat, descriptor: &Descriptor) -> Value {
    let typed = serde_json::to_value(descriptor).unwrap_or(Value::Null);
    match (format, descriptor) {
        (EntryFormat::Typed, _) => typed,
        (EntryFormat::Gemini, Descriptor::Http { url, headers }) => {
            let mut obj = Map::new();
            obj.insert("httpUrl".into(), Value::String(url.clone()));
            insert_headers(&mut obj, headers.as_ref());
            Value::Object(obj)
        }
        (EntryFormat::Gemini, Descriptor::StreamEvents { url, headers }) => {
            let mut obj = Map::new();
            obj.insert("url".into(), Value::String(url.clone()));
            insert_headers(&mut obj, headers.as_ref());
            Value::Object(obj)
        }
        (EntryFormat::Gemini, Descriptor::Stdio { .. }) => {
            let mut value = typed;
            if let Some(obj) = value.as_object_mut() {
                obj.remove("type");
            }
            value
        }
    }
}

fn insert_headers(obj: &mut Map<String, Value>, headers: Option<&BTreeMap<String, String>>) {
    if let Some(headers) = headers {
        let map = headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        obj.insert("headers".into(), Value::Object(map));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{InstallOptions, fingerprint, install_simple};
    use serde_json::json;

    static TYPED: ClientSpec = ClientSpec {
        id: "typed-test",
        executable: "typed-test-cli",
        project_file: Some(".mcp.json"),
        user_file: ".typed.json",
        format: EntryFormat::Typed,
        capabilities: AdapterCapabilities::both(),
    };

    static GEMINI: ClientSpec = ClientSpec {
        id: "gemini-test",
        executable: "gemini-test-cli",
        project_file: Some(".gemini/settings.json"),
        user_file: ".gemini/settings.json",
        format: EntryFormat::Gemini,
        capabilities: AdapterCapabilities::both(),
    };

    fn adapter(spec: &'static ClientSpec, dir: &Path) -> JsonFileAdapter {
        JsonFileAdapter::new(spec, dir.join("project"), dir.join("home"))
    }

    #[test]
    fn test_missing_file_is_empty_known() {
        let dir = tempfile::tempdir().unwrap();
        let state = adapter(&TYPED, dir.path()).read_current(Scope::Project).unwrap();
        assert_eq!(state, CurrentState::empty());
    }

    #[test]
    fn test_invalid_json_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(&TYPED, dir.path());
        let path = a.file_path(Scope::Project).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(a.read_current(Scope::Project).unwrap(), CurrentState::Unknown);
        let add = PlanAction::Add {
            name: "x".into(),
            server: Descriptor::http("https://x"),
        };
        assert!(a.apply_action(&add, Scope::Project).is_err());
    }

    #[test]
    fn test_infers_type_and_skips_bad_entries() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(&TYPED, dir.path());
        let path = a.file_path(Scope::User).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let doc = json!({
            "mcpServers": {
                "fs": { "command": "npx", "args": ["fs"], "env": {} },
                "web": { "url": "https://web" },
                "bogus": 42
            }
        });
        fs::write(&path, doc.to_string()).unwrap();

        let state = a.read_current(Scope::User).unwrap();
        let servers = state.servers().unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers["fs"], Descriptor::stdio("npx", ["fs"]));
        assert_eq!(servers["web"], Descriptor::http("https://web"));
    }

    #[test]
    fn test_nested_project_blocks_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(&TYPED, dir.path());
        let path = a.file_path(Scope::User).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let theirs = json!({ "type": "http", "url": "https://theirs" });
        let doc = json!({
            "projects": { "/other/repo": { "mcpServers": { "theirs": theirs.clone() } } }
        });
        fs::write(&path, doc.to_string()).unwrap();

        assert_eq!(a.read_current(Scope::User).unwrap(), CurrentState::empty());

        let desired: reconcile::DesiredState =
            [("mine".to_string(), Descriptor::http("https://mine"))]
                .into_iter()
                .collect();
        let opts = InstallOptions {
            scope: Scope::User,
            prune: true,
            ..Default::default()
        };
        let report = install_simple(&a, desired, opts).unwrap();
        let labels: Vec<_> = report.plan.iter().map(|p| p.label()).collect();
        assert_eq!(labels, ["add"]);

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["mcpServers"]["mine"]["url"], "https://mine");
        assert_eq!(written["projects"]["/other/repo"]["mcpServers"]["theirs"], theirs);
        assert!(
            written["projects"]["/other/repo"]["mcpServers"]
                .get("mine")
                .is_none()
        );
    }

    #[test]
    fn test_write_preserves_other_keys_and_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(&TYPED, dir.path());
        let path = a.file_path(Scope::Project).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            json!({ "theme": "dark", "mcpServers": { "old": { "type": "http", "url": "https://old" } } })
                .to_string(),
        )
        .unwrap();

        let add = PlanAction::Add {
            name: "new".into(),
            server: Descriptor::http("https://new"),
        };
        a.apply_action(&add, Scope::Project).unwrap();
        a.apply_action(&PlanAction::Remove { name: "old".into() }, Scope::Project)
            .unwrap();

        let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["theme"], "dark");
        assert_eq!(doc["mcpServers"]["new"]["url"], "https://new");
        assert!(doc["mcpServers"].get("old").is_none());

        let backup: Value =
            serde_json::from_str(&fs::read_to_string(paths::with_suffix(&path, "bak")).unwrap())
                .unwrap();
        assert!(backup["mcpServers"].get("old").is_some());
    }

    #[test]
    fn test_gemini_format_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(&GEMINI, dir.path());
        let sse = Descriptor::StreamEvents {
            url: "https://events".into(),
            headers: None,
        };
        for (name, server) in [("h", Descriptor::http("https://h")), ("s", sse.clone())] {
            let add = PlanAction::Add {
                name: name.into(),
                server,
            };
            a.apply_action(&add, Scope::Project).unwrap();
        }

        let path = a.file_path(Scope::Project).unwrap();
        let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["mcpServers"]["h"]["httpUrl"], "https://h");
        assert_eq!(doc["mcpServers"]["s"]["url"], "https://events");

        let state = a.read_current(Scope::Project).unwrap();
        assert_eq!(state.get("s"), Some(&sse));
    }

    #[test]
    fn test_install_twice_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(&TYPED, dir.path());
        let desired: reconcile::DesiredState = [
            ("a".to_string(), Descriptor::http("https://a")),
            ("b".to_string(), Descriptor::stdio("node", ["srv.js"])),
        ]
        .into_iter()
        .collect();

        let first = install_simple(&a, desired.clone(), InstallOptions::default()).unwrap();
        assert_eq!(first.summary.added, 2);

        let second = install_simple(&a, desired.clone(), InstallOptions::default()).unwrap();
        assert_eq!(second.summary.total_changes(), 0);

        let state = a.read_current(Scope::Project).unwrap();
        assert_eq!(
            fingerprint(state.get("b").unwrap()),
            fingerprint(&desired["b"])
        );
    }
}

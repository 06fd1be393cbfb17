//! Client adapter registry

pub mod json_file;

use crate::paths;
use anyhow::{Result, bail};
use json_file::{ClientSpec, EntryFormat, JsonFileAdapter};
use reconcile::AdapterCapabilities;
use std::path::Path;

/// Every supported client
pub static CLIENTS: &[ClientSpec] = &[
    ClientSpec {
        id: "claude-code",
        executable: "claude",
        project_file: Some(".mcp.json"),
        user_file: ".claude.json",
        format: EntryFormat::Typed,
        capabilities: AdapterCapabilities::both(),
    },
    ClientSpec {
        id: "cursor",
        executable: "cursor",
        project_file: Some(".cursor/mcp.json"),
        user_file: ".cursor/mcp.json",
        format: EntryFormat::Typed,
        capabilities: AdapterCapabilities::both(),
    },
    ClientSpec {
        id: "gemini-cli",
        executable: "gemini",
        project_file: Some(".gemini/settings.json"),
        user_file: ".gemini/settings.json",
        format: EntryFormat::Gemini,
        capabilities: AdapterCapabilities::both(),
    },
    ClientSpec {
        id: "windsurf",
        executable: "windsurf",
        project_file: None,
        user_file: ".codeium/windsurf/mcp_config.json",
        format: EntryFormat::Typed,
        capabilities: AdapterCapabilities::user_only_emulated(),
    },
];

/// Ids of all supported clients
pub fn client_ids() -> Vec<&'static str> {
    CLIENTS.iter().map(|c| c.id).collect()
}

/// Adapter for `id`, rooted at `project_root`
pub fn get_adapter(id: &str, project_root: &Path) -> Result<JsonFileAdapter> {
    let Some(spec) = CLIENTS.iter().find(|c| c.id == id) else {
        bail!(
            "Unsupported client: {id} (supported: {})",
            client_ids().join(", ")
        );
    };
    Ok(JsonFileAdapter::new(
        spec,
        project_root.to_path_buf(),
        paths::home_dir()?,
    ))
}

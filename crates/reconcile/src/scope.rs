//! Capability-based scope resolution

use crate::error::{Error, Result};
use crate::types::Scope;
use serde::{Deserialize, Serialize};

/// Static scope support of a client adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterCapabilities {
    pub supports_project: bool,
    pub supports_user: bool,
    /// Project registrations may be written to the user scope instead
    pub emulate_project_with_user: bool,
    /// Client distinguishes an explicit global scope from user
    pub supports_global_explicit: bool,
}

impl AdapterCapabilities {
    /// Both scopes addressed directly
    pub const fn both() -> Self {
        Self {
            supports_project: true,
            supports_user: true,
            emulate_project_with_user: false,
            supports_global_explicit: false,
        }
    }

    /// Only the user scope, standing in for project
    pub const fn user_only_emulated() -> Self {
        Self {
            supports_project: false,
            supports_user: true,
            emulate_project_with_user: true,
            supports_global_explicit: false,
        }
    }

    pub fn supports(&self, scope: Scope) -> bool {
        match scope {
            Scope::Project => self.supports_project,
            Scope::User => self.supports_user,
        }
    }
}

impl Default for AdapterCapabilities {
    fn default() -> Self {
        Self::both()
    }
}

/// How the requested scope was realized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeMode {
    Native,
    Emulated,
}

/// Outcome of scope resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeResolution {
    pub requested: Scope,
    pub realized: Scope,
    pub mode: ScopeMode,
}

impl ScopeResolution {
    pub fn is_emulated(&self) -> bool {
        self.mode == ScopeMode::Emulated
    }
}

/// Decide where registrations for `requested` actually go
pub fn resolve_scope(requested: Scope, caps: &AdapterCapabilities) -> Result<ScopeResolution> {
    if caps.supports(requested) {
        return Ok(ScopeResolution {
            requested,
            realized: requested,
            mode: ScopeMode::Native,
        });
    }

    if requested == Scope::Project && caps.emulate_project_with_user && caps.supports_user {
        log::info!("Project scope unsupported by client, emulating with user scope");
        return Ok(ScopeResolution {
            requested,
            realized: Scope::User,
            mode: ScopeMode::Emulated,
        });
    }

    Err(Error::ScopeUnsupported { requested })
}

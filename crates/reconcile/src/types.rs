//! Core types for MCP server reconciliation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Registration namespace of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Repository-local registrations
    Project,
    /// Per-user (global) registrations
    User,
}

impl Scope {
    /// The other scope
    pub fn other(self) -> Self {
        match self {
            Self::Project => Self::User,
            Self::User => Self::Project,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "user" | "global" => Ok(Self::User),
            other => Err(format!("unknown scope '{other}' (expected project or user)")),
        }
    }
}

/// How to reach or spawn one registered server
///
/// Serialized with a `type` tag so the same shape is used in client files,
/// lock snapshots and plan output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Descriptor {
    /// Streamable HTTP endpoint
    #[serde(rename = "http")]
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<BTreeMap<String, String>>,
    },
    /// Server-sent events endpoint
    #[serde(rename = "sse")]
    StreamEvents {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<BTreeMap<String, String>>,
    },
    /// Locally spawned process speaking over stdio
    #[serde(rename = "stdio")]
    Stdio {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        env: Option<BTreeMap<String, String>>,
    },
}

impl Descriptor {
    pub fn http(url: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            headers: None,
        }
    }

    pub fn stdio<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stdio {
            command: command.into(),
            args: Some(args.into_iter().map(Into::into).collect()),
            env: None,
        }
    }

    /// Transport tag as written in client files
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::StreamEvents { .. } => "sse",
            Self::Stdio { .. } => "stdio",
        }
    }

    /// Short human-readable target (url or command line)
    pub fn target(&self) -> String {
        match self {
            Self::Http { url, .. } | Self::StreamEvents { url, .. } => url.clone(),
            Self::Stdio { command, args, .. } => match args {
                Some(args) if !args.is_empty() => format!("{command} {}", args.join(" ")),
                _ => command.clone(),
            },
        }
    }

    /// Collapse empty optional collections to `None`
    pub fn normalized(self) -> Self {
        match self {
            Self::Http { url, headers } => Self::Http {
                url,
                headers: non_empty_map(headers),
            },
            Self::StreamEvents { url, headers } => Self::StreamEvents {
                url,
                headers: non_empty_map(headers),
            },
            Self::Stdio { command, args, env } => Self::Stdio {
                command,
                args: args.filter(|a| !a.is_empty()),
                env: non_empty_map(env),
            },
        }
    }
}

fn non_empty_map(map: Option<BTreeMap<String, String>>) -> Option<BTreeMap<String, String>> {
    map.filter(|m| !m.is_empty())
}

/// Named descriptors, ordered by name
pub type ServerMap = BTreeMap<String, Descriptor>;

/// Desired registrations built once per run from configuration
pub type DesiredState = ServerMap;

/// Registrations reported by an adapter for one scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentState {
    /// The adapter enumerated every registration
    Known(ServerMap),
    /// The adapter cannot enumerate registrations reliably
    Unknown,
}

impl CurrentState {
    pub fn empty() -> Self {
        Self::Known(ServerMap::new())
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// The enumerated servers, if known
    pub fn servers(&self) -> Option<&ServerMap> {
        match self {
            Self::Known(map) => Some(map),
            Self::Unknown => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.servers().and_then(|m| m.get(name))
    }
}

impl Default for CurrentState {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<ServerMap> for CurrentState {
    fn from(map: ServerMap) -> Self {
        Self::Known(map)
    }
}

/// Counts reported after applying a plan to one client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub failed: usize,
}

impl ApplySummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.added + self.updated + self.removed
    }

    /// Check if every action succeeded
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ApplySummary) {
        self.added += other.added;
        self.updated += other.updated;
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

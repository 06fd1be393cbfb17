//! Desired-state builder
//!
//! Maps the validated configuration record into descriptors. Parsing and
//! validation of the record happen before this point.

use crate::types::{DesiredState, Descriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level configuration record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Schema version of the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Client adapters this config applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<String>>,

    /// Named server entries
    #[serde(default, alias = "mcp")]
    pub servers: BTreeMap<String, ServerConfig>,
}

/// One server entry, tagged by transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum ServerConfig {
    Http(RemoteServer),
    Sse(RemoteServer),
    Stdio(ProcessServer),
}

/// Fields of an HTTP-reachable server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteServer {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Fields of a locally spawned server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessServer {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ServerConfig {
    /// Transport tag as written in the config file
    pub fn transport(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Sse(_) => "sse",
            Self::Stdio(_) => "stdio",
        }
    }

    /// Descriptor for this entry, with empty collections collapsed
    pub fn to_descriptor(&self) -> Descriptor {
        let descriptor = match self {
            Self::Http(remote) => Descriptor::Http {
                url: remote.url.clone(),
                headers: remote.headers.clone(),
            },
            Self::Sse(remote) => Descriptor::StreamEvents {
                url: remote.url.clone(),
                headers: remote.headers.clone(),
            },
            Self::Stdio(process) => Descriptor::Stdio {
                command: process.command.clone(),
                args: process.args.clone(),
                env: process.env.clone(),
            },
        };
        descriptor.normalized()
    }
}

/// Build the desired state from a configuration record
pub fn build_desired(config: &SyncConfig) -> DesiredState {
    let desired: DesiredState = config
        .servers
        .iter()
        .map(|(name, server)| (name.clone(), server.to_descriptor()))
        .collect();
    log::debug!("Built desired state with {} server(s)", desired.len());
    desired
}

//! Run records for the project history file

use crate::diff::PlanAction;
use crate::fingerprint::fingerprint;
use crate::scope::ScopeMode;
use crate::types::{ApplySummary, CurrentState, DesiredState, Scope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of runs kept in history
pub const DEFAULT_HISTORY_KEEP: usize = 20;

/// What happened to one name during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Add,
    Update,
    Remove,
    Skip,
    Apply,
    Failed,
}

impl From<&PlanAction> for Outcome {
    fn from(action: &PlanAction) -> Self {
        match action {
            PlanAction::Add { .. } => Self::Add,
            PlanAction::Update { .. } => Self::Update,
            PlanAction::Remove { .. } => Self::Remove,
            PlanAction::Skip { .. } => Self::Skip,
            PlanAction::Apply { .. } => Self::Apply,
        }
    }
}

/// Whether the run was meant to update the lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Applied and recorded in the lockfile
    Project,
    /// Applied to the client only
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub outcome: Outcome,
}

/// One executed run against one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub client: String,
    pub requested_scope: Scope,
    pub realized_scope: Scope,
    pub mode: ScopeMode,
    pub intent: Intent,
    pub result: ApplySummary,
    pub entries: BTreeMap<String, RunEntry>,
}

/// Derive per-name history entries from an executed plan
///
/// Writes carry the desired fingerprint, skips carry the fingerprint that
/// was already registered, removals carry none.
pub fn build_run_entries(
    plan: &[PlanAction],
    desired: &DesiredState,
    current: &CurrentState,
    scope: Scope,
) -> BTreeMap<String, RunEntry> {
    plan.iter()
        .map(|action| {
            let name = action.name();
            let source = match action {
                PlanAction::Remove { .. } => None,
                PlanAction::Skip { .. } => current.get(name),
                PlanAction::Add { .. } | PlanAction::Update { .. } | PlanAction::Apply { .. } => {
                    desired.get(name)
                }
            };
            let entry = RunEntry {
                scope,
                fingerprint: source.map(fingerprint),
                outcome: Outcome::from(action),
            };
            (name.to_string(), entry)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

/// Run history of one project, most recent first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectInfo>,
    #[serde(default)]
    pub runs: Vec<RunRecord>,
}

impl ProjectState {
    pub fn new(root: Option<String>) -> Self {
        Self {
            version: "1".to_string(),
            project: root.map(|root| ProjectInfo { root: Some(root) }),
            runs: Vec::new(),
        }
    }

    /// Insert a run at the front, keeping at most `keep` runs (minimum one)
    pub fn push_run(&mut self, run: RunRecord, keep: usize) {
        self.runs.insert(0, run);
        self.runs.truncate(keep.max(1));
    }
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::new(None)
    }
}

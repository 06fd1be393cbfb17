//! Client adapter port
//!
//! A ClientAdapter is the only thing that touches a client's own files or
//! CLI. The engine reads current state through it and hands it one plan
//! action at a time.

use crate::diff::PlanAction;
use crate::scope::AdapterCapabilities;
use crate::types::{ApplySummary, CurrentState, Scope};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of applying one plan action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionResult {
    Added,
    Updated,
    Removed,
    /// Nothing to do
    Unchanged,
    Failed { error: String },
}

impl ActionResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

impl ApplySummary {
    /// Count one action result
    pub fn add_result(&mut self, result: &ActionResult) {
        match result {
            ActionResult::Added => self.added += 1,
            ActionResult::Updated => self.updated += 1,
            ActionResult::Removed => self.removed += 1,
            ActionResult::Unchanged => {}
            ActionResult::Failed { .. } => self.failed += 1,
        }
    }
}

/// Port to one client tool's registration store
///
/// # Example
///
/// ```ignore
/// use reconcile::{ClientAdapter, CurrentState, PlanAction, Scope};
///
/// struct NullClient;
///
/// impl ClientAdapter for NullClient {
///     fn id(&self) -> &str { "null" }
///
///     fn read_current(&self, _scope: Scope) -> anyhow::Result<CurrentState> {
///         Ok(CurrentState::empty())
///     }
///
///     fn apply_action(&self, _action: &PlanAction, _scope: Scope) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait ClientAdapter {
    /// Stable client identifier, e.g. "claude-code"
    fn id(&self) -> &str;

    /// Static scope support, queried once per run
    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::both()
    }

    /// Whether the client tool is installed
    ///
    /// Advisory only; file-based adapters work without it.
    fn check_available(&self) -> bool {
        true
    }

    /// File backing a scope, for diagnostics
    fn source_path(&self, _scope: Scope) -> Option<PathBuf> {
        None
    }

    /// Read current registrations for one scope
    ///
    /// Return [`CurrentState::Unknown`] when registrations cannot be
    /// enumerated reliably.
    fn read_current(&self, scope: Scope) -> Result<CurrentState>;

    /// Apply a single add, update, apply or remove action
    fn apply_action(&self, action: &PlanAction, scope: Scope) -> Result<()>;

    /// Apply a plan sequentially
    ///
    /// A failing action is counted and the rest still run.
    fn apply_actions(&self, plan: &[PlanAction], scope: Scope) -> ApplySummary {
        let mut summary = ApplySummary::default();
        for action in plan {
            summary.add_result(&apply_one(self, action, scope));
        }
        summary
    }
}

/// Apply one action, folding errors into [`ActionResult::Failed`]
pub fn apply_one<A: ClientAdapter + ?Sized>(
    adapter: &A,
    action: &PlanAction,
    scope: Scope,
) -> ActionResult {
    if !action.is_change() {
        return ActionResult::Unchanged;
    }

    match adapter.apply_action(action, scope) {
        Ok(()) => match action {
            PlanAction::Add { .. } => ActionResult::Added,
            PlanAction::Update { .. } | PlanAction::Apply { .. } => ActionResult::Updated,
            PlanAction::Remove { .. } => ActionResult::Removed,
            PlanAction::Skip { .. } => ActionResult::Unchanged,
        },
        Err(e) => {
            log::warn!(
                "{} {} failed for {}: {e:#}",
                adapter.id(),
                action.label(),
                action.name()
            );
            ActionResult::Failed {
                error: format!("{e:#}"),
            }
        }
    }
}

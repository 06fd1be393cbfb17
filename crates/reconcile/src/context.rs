//! Progress and confirmation provider traits
//!
//! These traits allow the engine to be driven without depending on a
//! specific terminal UI or prompt library.

use crate::adapter::ActionResult;
use crate::diff::PlanAction;
use crate::types::ApplySummary;
use anyhow::Result;

/// Progress callback for plan application
pub trait ProgressCallback {
    /// Called before the first action with the number of changing actions
    fn on_apply_start(&mut self, client: &str, count: usize);

    /// Called when starting to apply a single action
    fn on_action_start(&mut self, action: &PlanAction);

    /// Called when an action completes
    fn on_action_complete(&mut self, action: &PlanAction, result: &ActionResult);

    /// Called after the last action
    fn on_apply_complete(&mut self, summary: &ApplySummary);
}

/// Confirmation callback for destructive steps
pub trait ConfirmCallback {
    /// Ask to confirm; `true` means proceed
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_apply_start(&mut self, _client: &str, _count: usize) {}
    fn on_action_start(&mut self, _action: &PlanAction) {}
    fn on_action_complete(&mut self, _action: &PlanAction, _result: &ActionResult) {}
    fn on_apply_complete(&mut self, _summary: &ApplySummary) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

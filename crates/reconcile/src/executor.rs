//! Execution engine - reconciles one client against a desired state

use crate::adapter::{ActionResult, ClientAdapter, apply_one};
use crate::context::{ConfirmCallback, ProgressCallback};
use crate::diff::{Plan, PlanAction, diff_desired_current};
use crate::error::{Error, Result};
use crate::lock::{Lockfile, build_lock, merge_lock};
use crate::record::{Intent, Outcome, RunEntry, RunRecord, build_run_entries};
use crate::scope::{ScopeResolution, resolve_scope};
use crate::types::{ApplySummary, CurrentState, DesiredState, Scope};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Where the desired state of a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredSource {
    /// Built from the project configuration
    Config,
    /// Rebuilt from lockfile snapshots
    Lock,
}

/// Options for a single install run
#[derive(Debug, Clone, Copy)]
pub struct InstallOptions {
    pub scope: Scope,
    /// Remove registrations absent from the desired state
    pub prune: bool,
    pub dry_run: bool,
    pub intent: Intent,
    pub source: DesiredSource,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            scope: Scope::Project,
            prune: false,
            dry_run: false,
            intent: Intent::Project,
            source: DesiredSource::Config,
        }
    }
}

/// Everything one run against one client produced
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub client: String,
    pub resolution: ScopeResolution,
    pub desired: DesiredState,
    pub current: CurrentState,
    pub plan: Plan,
    pub summary: ApplySummary,
    /// Names whose action failed
    pub failed: BTreeSet<String>,
    pub entries: BTreeMap<String, RunEntry>,
    pub options: InstallOptions,
    /// Set once the plan has been applied
    pub applied: bool,
}

impl InstallReport {
    /// Whether actions were actually applied
    pub fn executed(&self) -> bool {
        self.applied
    }

    /// Number of removals in the plan
    pub fn removals(&self) -> usize {
        self.plan.iter().filter(|a| a.is_removal()).count()
    }

    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }

    /// Lock to persist after this run, merged over `prev`
    ///
    /// Only a successful, executed, project-intent run whose desired state
    /// came from configuration updates the lock. The lock records the
    /// requested scope, so clients that emulate it share entries with those
    /// that realize it natively. It always covers this report's client.
    pub fn lock_update(&self, prev: Option<&Lockfile>, clients: &[String]) -> Option<Lockfile> {
        let eligible = self.executed()
            && self.is_success()
            && self.options.intent == Intent::Project
            && self.options.source == DesiredSource::Config;
        if !eligible {
            log::debug!("{}: lock not updated by this run", self.client);
            return None;
        }

        let mut next = build_lock(clients.iter().cloned(), &self.desired, self.resolution.requested);
        next.clients.insert(self.client.clone());
        Some(merge_lock(prev, next))
    }

    /// History record for this run, if it was executed
    pub fn run_record(&self, now: DateTime<Utc>) -> Option<RunRecord> {
        if !self.executed() {
            return None;
        }
        Some(RunRecord {
            timestamp: now,
            client: self.client.clone(),
            requested_scope: self.resolution.requested,
            realized_scope: self.resolution.realized,
            mode: self.resolution.mode,
            intent: self.options.intent,
            result: self.summary,
            entries: self.entries.clone(),
        })
    }
}

/// Plan one client against `desired` without touching it
///
/// Resolves scope, reads current registrations and diffs. Only precondition
/// failures return `Err`.
pub fn plan_install<A: ClientAdapter + ?Sized>(
    adapter: &A,
    desired: DesiredState,
    opts: InstallOptions,
) -> Result<InstallReport> {
    let client = adapter.id().to_string();
    let resolution = resolve_scope(opts.scope, &adapter.capabilities())?;
    let scope = resolution.realized;

    let current = adapter.read_current(scope).map_err(Error::Adapter)?;
    if !current.is_known() {
        log::info!("{client}: current {scope} registrations unknown, applying all");
    }

    let plan = diff_desired_current(&desired, &current, opts.prune);
    log::debug!("{client}: planned {} action(s) at {scope} scope", plan.len());

    Ok(InstallReport {
        client,
        resolution,
        entries: build_run_entries(&plan, &desired, &current, scope),
        desired,
        current,
        plan,
        summary: ApplySummary::default(),
        failed: BTreeSet::new(),
        options: opts,
        applied: false,
    })
}

/// Ask before a planned run removes anything
///
/// Fails with [`Error::PruneDeclined`] when the callback says no.
pub fn confirm_prune<C: ConfirmCallback>(report: &InstallReport, confirm: &mut C) -> Result<()> {
    let removals = report.removals();
    if removals == 0 {
        return Ok(());
    }
    let prompt = format!(
        "Remove {removals} server(s) from {} ({})?",
        report.client, report.resolution.realized
    );
    if confirm.confirm(&prompt).map_err(Error::Confirm)? {
        Ok(())
    } else {
        Err(Error::PruneDeclined { count: removals })
    }
}

/// Apply a planned run sequentially
///
/// Individual action failures are counted in the report and never stop the
/// remaining actions. Dry-run reports are returned unchanged.
pub fn apply_planned<A, P>(adapter: &A, mut report: InstallReport, progress: &mut P) -> InstallReport
where
    A: ClientAdapter + ?Sized,
    P: ProgressCallback,
{
    if report.options.dry_run || report.applied {
        return report;
    }
    let scope = report.resolution.realized;

    let changes: Vec<&PlanAction> = report.plan.iter().filter(|a| a.is_change()).collect();
    progress.on_apply_start(&report.client, changes.len());

    let mut failed = BTreeSet::new();
    let mut summary = ApplySummary::default();
    for action in changes {
        progress.on_action_start(action);
        let result = apply_one(adapter, action, scope);
        progress.on_action_complete(action, &result);
        summary.add_result(&result);
        if let ActionResult::Failed { .. } = result {
            failed.insert(action.name().to_string());
        }
    }

    for name in &failed {
        if let Some(entry) = report.entries.get_mut(name) {
            entry.outcome = Outcome::Failed;
        }
    }
    report.summary = summary;
    report.failed = failed;
    report.applied = true;

    progress.on_apply_complete(&report.summary);
    log::debug!(
        "{}: {} change(s), {} failed",
        report.client,
        report.summary.total_changes(),
        report.summary.failed
    );

    report
}

/// Reconcile one client against `desired`
///
/// Plans, confirms pruning and applies. A dry run returns the plan without
/// prompting.
pub fn install<A, P, C>(
    adapter: &A,
    desired: DesiredState,
    opts: InstallOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<InstallReport>
where
    A: ClientAdapter + ?Sized,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let report = plan_install(adapter, desired, opts)?;
    if opts.dry_run {
        return Ok(report);
    }
    confirm_prune(&report, confirm)?;
    Ok(apply_planned(adapter, report, progress))
}

/// Install without callbacks, auto-confirming pruning
///
/// For basic use cases where you don't need progress or confirmation.
pub fn install_simple<A: ClientAdapter + ?Sized>(
    adapter: &A,
    desired: DesiredState,
    opts: InstallOptions,
) -> Result<InstallReport> {
    use crate::context::{AutoConfirm, NoProgress};

    install(adapter, desired, opts, &mut NoProgress, &mut AutoConfirm)
}

use anyhow::Result;
use colored::Colorize;
use reconcile::{
    ActionResult, ApplySummary, ConfirmCallback, PlanAction, PlanSummary, ProgressCallback,
};
use std::io::IsTerminal;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Shorten a fingerprint for display
pub fn short_fingerprint(fp: &str) -> &str {
    fp.get(..12).unwrap_or(fp)
}

// ============================================================================
// Plan Output
// ============================================================================

fn action_marker(action: &PlanAction) -> colored::ColoredString {
    match action {
        PlanAction::Add { .. } => "+".green().bold(),
        PlanAction::Update { .. } => "~".yellow().bold(),
        PlanAction::Apply { .. } => "!".yellow().bold(),
        PlanAction::Remove { .. } => "-".red().bold(),
        PlanAction::Skip { .. } => "=".dimmed(),
    }
}

/// Print a plan, one line per action
pub fn print_plan(plan: &[PlanAction], verbose: bool) {
    for action in plan {
        if !action.is_change() && !verbose {
            continue;
        }
        let target = action.server().map(|s| s.target()).unwrap_or_default();
        println!(
            "  {} {:<8} {} {}",
            action_marker(action),
            action.label(),
            action.name().bold(),
            target.dimmed()
        );
    }

    let summary = PlanSummary::from_plan(plan);
    if !summary.has_changes() {
        dim("No changes");
        return;
    }
    dim(&format!(
        "{} to add, {} to update, {} to apply, {} to remove, {} unchanged",
        summary.add, summary.update, summary.apply, summary.remove, summary.skip
    ));
}

/// Print the counts of an applied plan
pub fn print_summary(client: &str, summary: &ApplySummary) {
    let line = format!(
        "{client}: added={} updated={} removed={} failed={}",
        summary.added, summary.updated, summary.removed, summary.failed
    );
    if summary.is_success() {
        success(&line);
    } else {
        warn(&line);
    }
}

// ============================================================================
// Engine Callbacks
// ============================================================================

/// Prints each action as it is applied
pub struct TerminalProgress {
    pub quiet: bool,
}

impl ProgressCallback for TerminalProgress {
    fn on_apply_start(&mut self, client: &str, count: usize) {
        if !self.quiet && count > 0 {
            section(&format!("Applying {count} change(s) to {client}"));
        }
    }

    fn on_action_start(&mut self, action: &PlanAction) {
        log::debug!("{} {}", action.label(), action.name());
    }

    fn on_action_complete(&mut self, action: &PlanAction, result: &ActionResult) {
        match result {
            ActionResult::Failed { error: e } => {
                error(&format!("{} {} failed: {e}", action.label(), action.name()));
            }
            _ if self.quiet => {}
            _ => println!("  {} {}", action_marker(action), action.name()),
        }
    }

    fn on_apply_complete(&mut self, _summary: &ApplySummary) {}
}

/// Asks on the terminal unless `--yes` was given
///
/// Without a terminal the answer is no.
pub struct PromptConfirm {
    pub assume_yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        if !std::io::stdin().is_terminal() {
            log::debug!("No terminal to confirm '{prompt}', declining");
            return Ok(false);
        }

        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}

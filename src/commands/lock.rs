use anyhow::Result;
use colored::Colorize;
use reconcile::{MismatchReason, Scope, VerifyMismatch, VerifyReport, build_desired, build_lock};
use std::path::PathBuf;

use crate::Context;
use crate::cli::SourceArgs;
use crate::{adapters, config, paths, state, ui};

/// Build a lock from the config; print it or write it to `out`
pub fn generate(
    ctx: &Context,
    clients: &[String],
    scope: Scope,
    out: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let root = paths::project_root()?;
    let loaded = config::load(config_path.as_deref(), &root)?;
    let clients = loaded.clients(clients);
    for id in &clients {
        adapters::get_adapter(id, &root)?;
    }

    let lock = build_lock(clients.iter().cloned(), &build_desired(&loaded.config), scope);

    match out {
        Some(out) => {
            let path = paths::resolve(&root, &out);
            state::write_lock(&path, &lock)?;
            if !ctx.quiet {
                ui::success(&format!("Wrote lockfile: {}", path.display()));
            }
        }
        None => print!("{}", lock.to_json_pretty()?),
    }
    Ok(())
}

/// Compare one client against the lock, exit 1 on drift
pub fn verify(ctx: &Context, client: &str, source: &SourceArgs) -> Result<()> {
    let root = paths::project_root()?;
    let lock_path = match (&source.lockfile, &source.config) {
        (Some(explicit), _) => paths::resolve(&root, explicit),
        (None, Some(path)) => config::load(Some(path), &root)?.lockfile_path(None),
        (None, None) => root.join(reconcile::LOCKFILE_NAME),
    };

    let lock = state::require_lock(&lock_path)?;
    let adapter = adapters::get_adapter(client, &root)?;
    let report = super::verify_client(&adapter, &lock)?;

    print_report(client, &report, ctx.quiet);
    if !report.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}

fn describe(m: &VerifyMismatch) -> String {
    let expected = m.expected_scope.map(Scope::as_str).unwrap_or("-");
    let actual_scope = m
        .actual
        .as_ref()
        .and_then(|a| a.scope)
        .map(Scope::as_str)
        .unwrap_or("-");
    match m.reason {
        MismatchReason::Missing => format!("missing from {expected} scope"),
        MismatchReason::FingerprintMismatch => {
            let fp = m
                .actual
                .as_ref()
                .and_then(|a| a.fingerprint.as_deref())
                .unwrap_or("");
            format!("changed in {expected} scope ({})", ui::short_fingerprint(fp))
        }
        MismatchReason::ScopeMismatch => {
            format!("expected in {expected} scope, found in {actual_scope}")
        }
        MismatchReason::Extra => format!("not in lockfile (found in {actual_scope} scope)"),
    }
}

fn print_report(client: &str, report: &VerifyReport, quiet: bool) {
    if report.is_ok() {
        if !quiet {
            ui::success(&format!("{client} matches the lockfile"));
        }
        return;
    }

    ui::header(&format!("{client}: {} mismatch(es)", report.mismatches.len()));
    for m in &report.mismatches {
        println!("  {} {} {}", "✗".red(), m.name.bold(), describe(m).dimmed());
    }
}

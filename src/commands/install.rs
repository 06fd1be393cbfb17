use anyhow::{Context as _, Result};
use chrono::Utc;
use reconcile::{
    ApplySummary, ClientAdapter, ConfirmCallback, DesiredSource, DesiredState, InstallOptions,
    InstallReport, Intent, Lockfile, ProgressCallback, Scope, apply_planned, build_desired,
    build_lock, confirm_prune, desired_from_lock, frozen_check, merge_lock, plan_install,
};
use std::path::{Path, PathBuf};

use crate::Context;
use crate::adapters;
use crate::cli::InstallArgs;
use crate::config::{self, LoadedConfig};
use crate::{paths, state, ui};

/// Where this run's desired state and lockfile come from
struct Sources {
    config: Option<LoadedConfig>,
    lock_path: PathBuf,
    clients: Vec<String>,
}

impl Sources {
    fn resolve(root: &Path, args: &InstallArgs) -> Result<Self> {
        // A lock-sourced run does not need a config file
        let config = if args.from_lock && args.source.config.is_none() {
            config::discover(root)
                .map(|p| config::load(Some(&p), root))
                .transpose()?
        } else {
            Some(config::load(args.source.config.as_deref(), root)?)
        };

        let lock_path = match (&config, args.source.lockfile.as_deref()) {
            (Some(loaded), explicit) => loaded.lockfile_path(explicit),
            (None, Some(explicit)) => paths::resolve(root, explicit),
            (None, None) => root.join(reconcile::LOCKFILE_NAME),
        };

        let clients = config::select_clients(
            &args.clients,
            config.as_ref().and_then(|c| c.config.clients.as_deref()),
        );

        Ok(Self {
            config,
            lock_path,
            clients,
        })
    }

    fn desired(&self) -> Result<DesiredState> {
        let loaded = self
            .config
            .as_ref()
            .context("A config file is required unless --from-lock is given")?;
        Ok(build_desired(&loaded.config))
    }
}

/// What one install run did across all clients
#[derive(Debug)]
struct InstallRun {
    reports: Vec<InstallReport>,
    lock_written: bool,
}

impl InstallRun {
    fn is_success(&self) -> bool {
        self.reports.iter().all(InstallReport::is_success)
    }
}

pub fn run(ctx: &Context, args: InstallArgs) -> Result<()> {
    let root = paths::project_root()?;
    let sources = Sources::resolve(&root, &args)?;
    let adapters = sources
        .clients
        .iter()
        .map(|id| adapters::get_adapter(id, &root))
        .collect::<Result<Vec<_>>>()?;

    let mut progress = ui::TerminalProgress { quiet: ctx.quiet };
    let mut confirm = ui::PromptConfirm {
        assume_yes: args.yes,
    };
    let outcome = execute(&root, &sources, &adapters, &args, &mut progress, &mut confirm)?;

    if args.lockfile_only {
        if outcome.lock_written {
            ui::success(&format!("Wrote {}", sources.lock_path.display()));
        } else {
            ui::warn("No clients selected; nothing to lock");
        }
        return Ok(());
    }

    for report in &outcome.reports {
        if report.resolution.is_emulated() && !ctx.quiet {
            ui::info(&format!(
                "{}: {} scope emulated with {} scope",
                report.client, report.resolution.requested, report.resolution.realized
            ));
        }
        if args.dry_run {
            ui::section(&format!("Plan for {} ({})", report.client, report.resolution.realized));
            ui::print_plan(&report.plan, ctx.verbose > 0);
        } else {
            ui::print_summary(&report.client, &report.summary);
        }
    }
    if args.dry_run {
        return Ok(());
    }

    if outcome.reports.len() > 1 {
        let mut total = ApplySummary::default();
        for report in &outcome.reports {
            total.merge(&report.summary);
        }
        ui::print_summary("total", &total);
    }

    if !outcome.is_success() {
        ui::error("Some servers failed to apply; lockfile and history left unchanged");
        std::process::exit(1);
    }
    if outcome.lock_written && !ctx.quiet {
        ui::dim(&format!("Updated {}", sources.lock_path.display()));
    }

    Ok(())
}

/// Plan every client, confirm removals, apply, then persist
///
/// No client is touched until every precondition and prune confirmation of
/// every client has passed. The lock and history are written once, and only
/// when every client applied without failures.
fn execute<A, P, C>(
    root: &Path,
    sources: &Sources,
    adapters: &[A],
    args: &InstallArgs,
    progress: &mut P,
    confirm: &mut C,
) -> Result<InstallRun>
where
    A: ClientAdapter,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let prev_lock = state::read_lock(&sources.lock_path)?;

    if args.lockfile_only {
        let lock_written = write_lock_only(sources, prev_lock.as_ref(), args.scope)?;
        return Ok(InstallRun {
            reports: Vec::new(),
            lock_written,
        });
    }

    let stored_lock = if args.from_lock || args.frozen_lock {
        let lock = prev_lock
            .clone()
            .with_context(|| format!("Lockfile not found: {}", sources.lock_path.display()))?;
        lock.ensure_clients(&sources.clients)?;
        Some(lock)
    } else {
        None
    };

    let config_desired = if args.from_lock {
        None
    } else {
        Some(sources.desired()?)
    };

    if args.frozen_lock
        && let (Some(stored), Some(desired)) = (&stored_lock, &config_desired)
    {
        frozen_check(stored, &build_lock(sources.clients.iter().cloned(), desired, args.scope))?;
        log::info!("Lockfile is up to date");
    }

    let opts = InstallOptions {
        scope: args.scope,
        prune: args.prune,
        dry_run: args.dry_run,
        intent: if args.local { Intent::Local } else { Intent::Project },
        source: if args.from_lock {
            DesiredSource::Lock
        } else {
            DesiredSource::Config
        },
    };

    let mut planned = Vec::with_capacity(adapters.len());
    for adapter in adapters {
        let desired = match (&config_desired, &stored_lock) {
            (Some(desired), _) => desired.clone(),
            (None, Some(lock)) => desired_from_lock(lock, args.scope)?,
            (None, None) => anyhow::bail!("Lockfile required for --from-lock"),
        };
        if !adapter.check_available() {
            log::info!("{} executable not found on PATH", adapter.id());
        }
        let report = plan_install(adapter, desired, opts)
            .with_context(|| format!("Planning {} failed", adapter.id()))?;
        planned.push(report);
    }

    if args.dry_run {
        return Ok(InstallRun {
            reports: planned,
            lock_written: false,
        });
    }

    for report in &planned {
        confirm_prune(report, confirm)?;
    }

    let reports: Vec<InstallReport> = planned
        .into_iter()
        .zip(adapters)
        .map(|(report, adapter)| apply_planned(adapter, report, progress))
        .collect();

    let mut run = InstallRun {
        reports,
        lock_written: false,
    };
    if !run.is_success() {
        return Ok(run);
    }

    if !args.frozen_lock {
        let next_lock = run.reports.iter().fold(prev_lock, |lock, report| {
            report.lock_update(lock.as_ref(), &sources.clients).or(lock)
        });
        if let Some(lock) = next_lock.filter(|_| run.reports.iter().any(updates_lock)) {
            state::write_lock(&sources.lock_path, &lock)?;
            run.lock_written = true;
        }
    }

    let now = Utc::now();
    let records = run.reports.iter().filter_map(|r| r.run_record(now)).collect();
    state::record_runs(root, records)?;

    Ok(run)
}

fn updates_lock(report: &InstallReport) -> bool {
    report.options.intent == Intent::Project && report.options.source == DesiredSource::Config
}

/// Build and merge the lock for every client without touching any of them
///
/// Returns whether a lock was written.
fn write_lock_only(sources: &Sources, prev: Option<&Lockfile>, scope: Scope) -> Result<bool> {
    if sources.clients.is_empty() {
        return Ok(false);
    }
    let desired = sources.desired()?;
    let next = build_lock(sources.clients.iter().cloned(), &desired, scope);
    let lock = merge_lock(prev, next);
    state::write_lock(&sources.lock_path, &lock)?;
    log::debug!("Wrote lock with {} server(s)", lock.entries.len());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::json_file::{ClientSpec, EntryFormat, JsonFileAdapter};
    use crate::cli::SourceArgs;
    use reconcile::{AdapterCapabilities, AutoConfirm, AutoDecline, Error, NoProgress};
    use serde_json::json;
    use std::fs;

    static NATIVE: ClientSpec = ClientSpec {
        id: "native",
        executable: "mcpsync-test-native",
        project_file: Some(".native.json"),
        user_file: ".native.json",
        format: EntryFormat::Typed,
        capabilities: AdapterCapabilities::both(),
    };

    static EMULATED: ClientSpec = ClientSpec {
        id: "emulated",
        executable: "mcpsync-test-emulated",
        project_file: None,
        user_file: ".emulated.json",
        format: EntryFormat::Typed,
        capabilities: AdapterCapabilities::user_only_emulated(),
    };

    struct Fixture {
        dir: tempfile::TempDir,
        adapters: Vec<JsonFileAdapter>,
    }

    impl Fixture {
        fn new(servers: serde_json::Value) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            let config = json!({ "clients": ["native", "emulated"], "servers": servers });
            fs::write(root.join("mcpsync.json"), config.to_string()).unwrap();

            let adapters = [&NATIVE, &EMULATED]
                .into_iter()
                .map(|spec| JsonFileAdapter::new(spec, root.to_path_buf(), root.join("home")))
                .collect();
            Self { dir, adapters }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn lock_path(&self) -> PathBuf {
            self.root().join(reconcile::LOCKFILE_NAME)
        }

        fn run(&self, args: &InstallArgs) -> Result<InstallRun> {
            self.run_with(args, &mut AutoConfirm)
        }

        fn run_with<C: ConfirmCallback>(&self, args: &InstallArgs, confirm: &mut C) -> Result<InstallRun> {
            let sources = Sources::resolve(self.root(), args)?;
            execute(self.root(), &sources, &self.adapters, args, &mut NoProgress, confirm)
        }
    }

    fn args() -> InstallArgs {
        InstallArgs {
            clients: Vec::new(),
            scope: Scope::Project,
            prune: false,
            yes: false,
            dry_run: false,
            local: false,
            from_lock: false,
            frozen_lock: false,
            lockfile_only: false,
            source: SourceArgs {
                config: None,
                lockfile: None,
            },
        }
    }

    fn servers() -> serde_json::Value {
        json!({ "a": { "transport": "http", "url": "https://a" } })
    }

    #[test]
    fn test_lock_written_once_and_verifies_for_every_client() {
        let fx = Fixture::new(servers());
        let run = fx.run(&args()).unwrap();

        assert!(run.is_success());
        assert!(run.lock_written);
        let lock = state::require_lock(&fx.lock_path()).unwrap();
        assert_eq!(lock.entries["a"].scope, Scope::Project);
        assert!(lock.clients.contains("native") && lock.clients.contains("emulated"));

        for adapter in &fx.adapters {
            let report = crate::commands::verify_client(adapter, &lock).unwrap();
            assert!(report.is_ok(), "{}: {:?}", report.client, report.mismatches);
        }
        assert_eq!(state::load_history(fx.root()).runs.len(), 2);
    }

    #[test]
    fn test_failed_client_leaves_lock_and_history_alone() {
        let fx = Fixture::new(servers());
        let home = fx.root().join("home");
        fs::create_dir_all(&home).unwrap();
        fs::write(home.join(".emulated.json"), "{ broken").unwrap();

        let run = fx.run(&args()).unwrap();

        assert!(!run.is_success());
        assert!(!run.lock_written);
        assert!(!fx.lock_path().exists());
        assert!(!paths::state_file(fx.root()).exists());
    }

    #[test]
    fn test_local_and_lock_sourced_runs_never_write_lock() {
        let fx = Fixture::new(servers());
        let local = InstallArgs {
            local: true,
            ..args()
        };
        let run = fx.run(&local).unwrap();
        assert!(run.is_success());
        assert!(!run.lock_written);
        assert!(!fx.lock_path().exists());

        fx.run(&args()).unwrap();
        let before = fs::read_to_string(fx.lock_path()).unwrap();
        fs::remove_file(fx.root().join(".native.json")).unwrap();

        let from_lock = InstallArgs {
            from_lock: true,
            ..args()
        };
        let run = fx.run(&from_lock).unwrap();
        assert!(!run.lock_written);
        assert_eq!(run.reports[0].summary.added, 1);
        assert_eq!(fs::read_to_string(fx.lock_path()).unwrap(), before);

        let frozen = InstallArgs {
            frozen_lock: true,
            ..args()
        };
        let run = fx.run(&frozen).unwrap();
        assert!(run.is_success());
        assert!(!run.lock_written);
    }

    #[test]
    fn test_frozen_lock_out_of_date_touches_nothing() {
        let fx = Fixture::new(servers());
        fx.run(&args()).unwrap();
        fs::write(
            fx.root().join("mcpsync.json"),
            json!({ "servers": { "a": { "transport": "http", "url": "https://changed" } } })
                .to_string(),
        )
        .unwrap();
        let native_before = fs::read_to_string(fx.root().join(".native.json")).unwrap();

        let frozen = InstallArgs {
            frozen_lock: true,
            clients: vec!["native".into(), "emulated".into()],
            ..args()
        };
        let err = fx.run(&frozen).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::LockOutOfDate { .. })
        ));
        assert_eq!(
            fs::read_to_string(fx.root().join(".native.json")).unwrap(),
            native_before
        );
    }

    #[test]
    fn test_lockfile_only_merges_without_touching_clients() {
        let fx = Fixture::new(servers());
        let mut prev = Lockfile::new(["native"]);
        prev.entries.insert(
            "kept".into(),
            reconcile::LockEntry {
                scope: Scope::User,
                fingerprint: "fp".into(),
                resolved_version: Some("1.0.0".into()),
                snapshot: None,
            },
        );
        state::write_lock(&fx.lock_path(), &prev).unwrap();

        let only = InstallArgs {
            lockfile_only: true,
            ..args()
        };
        let run = fx.run(&only).unwrap();

        assert!(run.lock_written);
        assert!(run.reports.is_empty());
        let lock = state::require_lock(&fx.lock_path()).unwrap();
        assert!(lock.entries.contains_key("a") && lock.entries.contains_key("kept"));
        assert!(!fx.root().join(".native.json").exists());
        assert!(!fx.root().join("home").join(".emulated.json").exists());
    }

    #[test]
    fn test_declined_prune_aborts_before_any_client_changes() {
        let fx = Fixture::new(servers());
        let user_file = fx.root().join("home").join(".emulated.json");
        fs::create_dir_all(user_file.parent().unwrap()).unwrap();
        fs::write(
            &user_file,
            json!({ "mcpServers": { "stale": { "type": "http", "url": "https://stale" } } })
                .to_string(),
        )
        .unwrap();

        let prune = InstallArgs {
            prune: true,
            ..args()
        };
        let err = fx.run_with(&prune, &mut AutoDecline).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::PruneDeclined { count: 1 })
        ));
        assert!(!fx.root().join(".native.json").exists());
        assert!(fs::read_to_string(&user_file).unwrap().contains("stale"));
        assert!(!fx.lock_path().exists());
    }

    #[test]
    fn test_dry_run_plans_without_writing() {
        let fx = Fixture::new(servers());
        let dry = InstallArgs {
            dry_run: true,
            prune: true,
            ..args()
        };
        let run = fx.run_with(&dry, &mut AutoDecline).unwrap();

        assert_eq!(run.reports.len(), 2);
        assert!(run.reports.iter().all(|r| !r.executed()));
        assert!(!fx.root().join(".native.json").exists());
        assert!(!fx.lock_path().exists());
        assert!(!paths::state_file(fx.root()).exists());
    }
}

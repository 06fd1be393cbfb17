use anyhow::Result;
use colored::Colorize;
use reconcile::{ClientAdapter, CurrentState, Scope, ServerMap, same_registration};
use std::fs;
use std::path::Path;

use crate::Context;
use crate::{adapters, paths, ui};

struct Issue {
    category: &'static str,
    summary: String,
    detail: Option<String>,
    fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Error,
}

/// Access to one settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileAccess {
    exists: bool,
    readable: bool,
    writable: bool,
}

pub fn run(ctx: &Context, client: &str) -> Result<()> {
    let root = paths::project_root()?;
    let adapter = adapters::get_adapter(client, &root)?;

    ui::header(&format!("{} Health Check", adapter.id()));

    let mut issues: Vec<Issue> = Vec::new();
    let mut has_error = false;

    // Check 1: Client executable
    ui::section("Client");
    if adapter.check_available() {
        println!("  {} executable found on PATH", "✓".green());
    } else {
        println!("  {} executable not found on PATH", "✗".red());
        has_error = true;
        issues.push(Issue {
            category: "Client",
            summary: format!("{} is not installed or not on PATH", adapter.id()),
            detail: None,
            fix: Some(format!("Install {} and make sure it is on PATH", adapter.id())),
        });
    }

    // Check 2: Settings files per scope
    ui::section("Settings Files");
    let mut scopes = [ServerMap::new(), ServerMap::new()];
    for (slot, scope) in [Scope::Project, Scope::User].into_iter().enumerate() {
        let Some(path) = adapter.source_path(scope) else {
            ui::dim(&format!("{scope}: not supported by this client"));
            continue;
        };
        let access = check_access(&path);
        print_access(scope, &path, access);
        if !access.writable {
            issues.push(Issue {
                category: "Settings Files",
                summary: format!("{scope} settings file is not writable"),
                detail: Some(path.display().to_string()),
                fix: Some("Check file and directory permissions".into()),
            });
        }

        match adapter.read_current(scope)? {
            CurrentState::Known(servers) => {
                if ctx.verbose > 0 {
                    ui::kv("servers", &servers.len().to_string());
                }
                scopes[slot] = servers;
            }
            CurrentState::Unknown => issues.push(Issue {
                category: "Settings Files",
                summary: format!("{scope} settings file could not be parsed"),
                detail: Some(path.display().to_string()),
                fix: Some("Fix the JSON syntax; mcpsync will not overwrite it".into()),
            }),
        }
    }

    // Check 3: Same name registered differently in both scopes
    ui::section("Scope Conflicts");
    let [project, user] = &scopes;
    let conflicts = find_conflicts(project, user);
    if conflicts.is_empty() {
        println!("  {} no conflicting names", "✓".green());
    } else {
        for name in &conflicts {
            println!("  {} {}", "⚠".yellow(), name);
        }
        issues.push(Issue {
            category: "Scope Conflicts",
            summary: format!("{} name(s) differ between project and user", conflicts.len()),
            detail: Some(conflicts.join(", ")),
            fix: Some("Remove or align one of the registrations".into()),
        });
    }

    println!();
    match overall_status(has_error, issues.len()) {
        Status::Ok => ui::success("All checks passed"),
        Status::Warn | Status::Error => print_issue_summary(&issues),
    }

    Ok(())
}

fn overall_status(has_error: bool, issue_count: usize) -> Status {
    if has_error {
        Status::Error
    } else if issue_count > 0 {
        Status::Warn
    } else {
        Status::Ok
    }
}

/// Names present in both scopes with different descriptors
fn find_conflicts(project: &ServerMap, user: &ServerMap) -> Vec<String> {
    project
        .iter()
        .filter(|(name, server)| {
            user.get(*name)
                .is_some_and(|other| !same_registration(server, other))
        })
        .map(|(name, _)| name.clone())
        .collect()
}

fn check_access(path: &Path) -> FileAccess {
    if path.exists() {
        let readable = fs::File::open(path).is_ok();
        let writable = fs::metadata(path).is_ok_and(|m| !m.permissions().readonly());
        return FileAccess {
            exists: true,
            readable,
            writable,
        };
    }

    // A missing file is writable if its nearest existing ancestor is
    let writable = path
        .ancestors()
        .skip(1)
        .find(|dir| dir.exists())
        .and_then(|dir| fs::metadata(dir).ok())
        .is_some_and(|m| !m.permissions().readonly());
    FileAccess {
        exists: false,
        readable: false,
        writable,
    }
}

fn print_access(scope: Scope, path: &Path, access: FileAccess) {
    let mark = if access.writable {
        "✓".green()
    } else {
        "✗".red()
    };
    let note = match (access.exists, access.readable) {
        (false, _) => "(will be created)".dimmed(),
        (true, true) => "".normal(),
        (true, false) => "(unreadable)".red(),
    };
    println!("  {mark} {scope}: {} {note}", path.display());
}

fn print_issue_summary(issues: &[Issue]) {
    let count = issues.len();
    let label = if count == 1 { "Issue" } else { "Issues" };
    ui::header(&format!("{count} {label} Found"));

    for (i, issue) in issues.iter().enumerate() {
        let num = i + 1;
        println!(
            "  {}  {} {}",
            format!("{num}.").bold(),
            issue.summary,
            format!("[{}]", issue.category).dimmed()
        );
        if let Some(detail) = &issue.detail {
            println!("      {}", detail.dimmed());
        }
        if let Some(fix) = &issue.fix {
            println!("      {} {}", "Fix:".cyan(), fix);
        }
        println!();
    }
}

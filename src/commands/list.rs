use anyhow::Result;
use colored::Colorize;
use reconcile::{ClientAdapter, CurrentState, Scope, fingerprint};

use crate::Context;
use crate::{adapters, paths, ui};

/// Show current registrations of one client with their fingerprints
pub fn run(ctx: &Context, client: &str, only: Option<Scope>) -> Result<()> {
    let root = paths::project_root()?;
    let adapter = adapters::get_adapter(client, &root)?;
    let caps = adapter.capabilities();

    let scopes: Vec<Scope> = match only {
        Some(scope) => vec![scope],
        None => vec![Scope::Project, Scope::User],
    };

    for scope in scopes {
        let source = adapter
            .source_path(scope)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".into());
        ui::section(&format!("{} {scope}", adapter.id()));
        if ctx.verbose > 0 {
            ui::kv("file", &source);
        }

        if !caps.supports(scope) {
            ui::dim("scope not supported by this client");
            continue;
        }

        match adapter.read_current(scope)? {
            CurrentState::Unknown => ui::warn(&format!("{source} could not be parsed")),
            CurrentState::Known(servers) if servers.is_empty() => ui::dim("no servers"),
            CurrentState::Known(servers) => {
                for (name, server) in &servers {
                    let fp = fingerprint(server);
                    println!(
                        "  {:<24} {:<6} {} {}",
                        name.bold(),
                        server.kind(),
                        ui::short_fingerprint(&fp).dimmed(),
                        server.target()
                    );
                }
            }
        }
    }

    Ok(())
}

mod adapters;
mod cli;
mod commands;
mod config;
mod paths;
mod runner;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, LockCommand};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Install(args) => commands::install::run(&ctx, args),
        Command::Lock(cmd) => match cmd {
            LockCommand::Generate {
                clients,
                scope,
                out,
                config,
            } => commands::lock::generate(&ctx, &clients, scope, out, config),
            LockCommand::Verify { client, source } => {
                commands::lock::verify(&ctx, &client.client, &source)
            }
        },
        Command::Ci(args) => commands::ci::run(&args.client.client, &args.lockfile),
        Command::Doctor(args) => commands::doctor::run(&ctx, &args.client),
        Command::List(args) => commands::list::run(&ctx, &args.client.client, args.scope),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "mcpsync", &mut io::stdout());
            Ok(())
        }
    }
}

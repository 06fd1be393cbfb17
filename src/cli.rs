use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use reconcile::Scope;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mcpsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Keep MCP server registrations in sync across AI clients", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply configured servers to one or more clients
    Install(InstallArgs),

    /// Generate or verify the lockfile
    #[command(subcommand)]
    Lock(LockCommand),

    /// Verify client state against the lockfile (JSON report, exit 1 on drift)
    Ci(CiArgs),

    /// Diagnose client availability, file access and scope conflicts
    Doctor(ClientArgs),

    /// Show registered servers with fingerprints
    List(ListArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared Arguments
// ============================================================================

#[derive(Args, Clone)]
pub struct ClientArgs {
    /// Client id (default: claude-code)
    #[arg(long, default_value = "claude-code")]
    pub client: String,
}

#[derive(Args, Clone)]
pub struct SourceArgs {
    /// Path to the configuration file
    #[arg(short, long, env = "MCPSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the lockfile (default: next to the config)
    #[arg(long)]
    pub lockfile: Option<PathBuf>,
}

// ============================================================================
// Install
// ============================================================================

#[derive(Args)]
pub struct InstallArgs {
    /// Client ids to install into (repeatable; default from config or claude-code)
    #[arg(long = "client")]
    pub clients: Vec<String>,

    /// Target scope: project or user
    #[arg(short, long, default_value = "project")]
    pub scope: Scope,

    /// Remove servers that are not in the configuration
    #[arg(long)]
    pub prune: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,

    /// Print the plan without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Apply without updating the lockfile
    #[arg(long)]
    pub local: bool,

    /// Install exactly what the lockfile records
    #[arg(long, conflicts_with = "lockfile_only")]
    pub from_lock: bool,

    /// Fail if the lockfile is out of date instead of updating it
    #[arg(long, conflicts_with = "lockfile_only")]
    pub frozen_lock: bool,

    /// Write the lockfile without touching any client
    #[arg(long)]
    pub lockfile_only: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

// ============================================================================
// Lock Commands
// ============================================================================

#[derive(Subcommand)]
pub enum LockCommand {
    /// Build the lockfile from the configuration
    Generate {
        /// Client ids recorded in the lock (repeatable)
        #[arg(long = "client")]
        clients: Vec<String>,

        /// Scope recorded for every entry
        #[arg(short, long, default_value = "project")]
        scope: Scope,

        /// Write the lockfile here instead of printing it
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Path to the configuration file
        #[arg(short, long, env = "MCPSYNC_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Compare client state against the lockfile
    Verify {
        #[command(flatten)]
        client: ClientArgs,

        #[command(flatten)]
        source: SourceArgs,
    },
}

// ============================================================================
// CI / List
// ============================================================================

#[derive(Args)]
pub struct CiArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Lockfile path
    #[arg(long, default_value = reconcile::LOCKFILE_NAME)]
    pub lockfile: PathBuf,
}

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Only show one scope
    #[arg(short, long)]
    pub scope: Option<Scope>,
}

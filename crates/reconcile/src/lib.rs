//! # Reconcile
//!
//! Reconciliation core for MCP server registrations.
//!
//! Given a desired set of named server descriptors and a client adapter, the
//! crate plans the minimal actions that bring the client in line, applies
//! them, and records the outcome in a lockfile and a run history.
//!
//! ## Core Concepts
//!
//! - **Descriptor**: Transport-tagged description of one server
//! - **Fingerprint**: SHA-256 of a descriptor's canonical JSON
//! - **Plan**: Ordered add/update/remove/skip/apply actions
//! - **Lockfile**: Last successfully applied state, mergeable and verifiable
//! - **ClientAdapter**: Port to one client tool's registration store
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{build_desired, install_simple, InstallOptions, SyncConfig};
//!
//! let config: SyncConfig = serde_json::from_str(text)?;
//! let report = install_simple(&adapter, build_desired(&config), InstallOptions::default())?;
//! let lock = report.lock_update(previous.as_ref(), &["claude-code".to_string()]);
//! ```
//!
//! ## Provider Traits
//!
//! - [`ClientAdapter`]: Reads and writes a client's registrations
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles prune confirmations

pub mod adapter;
pub mod context;
pub mod desired;
pub mod diff;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod lock;
pub mod record;
pub mod scope;
pub mod types;

// Re-export main types at crate root
pub use adapter::{ActionResult, ClientAdapter, apply_one};
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use desired::{ProcessServer, RemoteServer, ServerConfig, SyncConfig, build_desired};
pub use diff::{Plan, PlanAction, PlanSummary, diff_by_names, diff_desired_current};
pub use error::{Error, Result};
pub use executor::{
    DesiredSource, InstallOptions, InstallReport, apply_planned, confirm_prune, install,
    install_simple, plan_install,
};
pub use fingerprint::{canonical_json, fingerprint, same_registration};
pub use lock::{
    ActualRegistration, LOCK_VERSION, LOCKFILE_NAME, LockEntry, Lockfile, MismatchReason,
    VerifyMismatch, VerifyReport, VerifyStatus, build_lock, desired_from_lock, frozen_check,
    merge_lock, verify_lock,
};
pub use record::{
    DEFAULT_HISTORY_KEEP, Intent, Outcome, ProjectInfo, ProjectState, RunEntry, RunRecord,
    build_run_entries,
};
pub use scope::{AdapterCapabilities, ScopeMode, ScopeResolution, resolve_scope};
pub use types::{ApplySummary, CurrentState, Descriptor, DesiredState, Scope, ServerMap};

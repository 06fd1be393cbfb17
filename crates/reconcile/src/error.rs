//! Error types for reconciliation runs.
//!
//! Every variant is a fatal precondition: it aborts the run before any
//! client is touched. Per-action failures are counted in
//! [`ApplySummary`](crate::ApplySummary) instead, and drift is reported as
//! [`VerifyMismatch`](crate::VerifyMismatch) values.

use crate::types::Scope;
use thiserror::Error;

/// Errors that abort a reconciliation run.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested scope is not supported and cannot be emulated
    #[error("{requested} scope unsupported by client and emulation not available")]
    ScopeUnsupported {
        /// Scope the caller asked for
        requested: Scope,
    },

    /// Lockfile was generated for a different set of clients
    #[error("lockfile clients [{}] do not include selected clients [{}]", lock.join(", "), selected.join(", "))]
    LockClientsMismatch {
        /// Clients recorded in the lockfile
        lock: Vec<String>,
        /// Clients selected for this run
        selected: Vec<String>,
    },

    /// A lock entry has no snapshot to apply from
    #[error("lock entry '{name}' has no snapshot; regenerate the lockfile")]
    SnapshotMissing {
        /// Server name of the entry
        name: String,
    },

    /// Configuration no longer matches the stored lock
    #[error("lockfile is out of date for: {}", names.join(", "))]
    LockOutOfDate {
        /// Names whose fingerprint or scope differ, or that are missing
        names: Vec<String>,
    },

    /// Lockfile has a version this build cannot read
    #[error("unsupported lockfile version '{found}' (expected \"1\")")]
    UnsupportedLockVersion {
        /// Version string found in the file
        found: String,
    },

    /// Removals were planned but not confirmed
    #[error("Refusing to prune {count} server(s) without confirmation (pass --yes)")]
    PruneDeclined {
        /// Number of planned removals
        count: usize,
    },

    /// Drift cannot be checked against an unreadable scope
    #[error("current {scope} state is unknown; cannot verify")]
    CurrentStateUnknown {
        /// Scope that could not be enumerated
        scope: Scope,
    },

    /// Lockfile JSON could not be parsed
    #[error("invalid lockfile: {0}")]
    Json(#[from] serde_json::Error),

    /// Adapter failed before any action was applied
    #[error("adapter error: {0:#}")]
    Adapter(anyhow::Error),

    /// Confirmation prompt could not be answered
    #[error("confirmation failed: {0:#}")]
    Confirm(anyhow::Error),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::ScopeUnsupported {
            requested: Scope::Project,
        };
        assert_eq!(
            err.to_string(),
            "project scope unsupported by client and emulation not available"
        );

        let err = Error::LockClientsMismatch {
            lock: vec!["claude-code".into()],
            selected: vec!["gemini-cli".into()],
        };
        assert!(err.to_string().contains("[claude-code]"));

        let err = Error::PruneDeclined { count: 2 };
        assert!(err.to_string().starts_with("Refusing to prune"));
    }
}

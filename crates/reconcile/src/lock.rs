//! Lockfile build, merge and verification
//!
//! A lockfile records what was last successfully applied: one entry per
//! server name with the scope it was requested in, its fingerprint and a
//! snapshot of the descriptor. It is always persisted whole.
//!
//! Recorded scopes are the requested ones, shared by every client in the
//! lock. A client that emulates a scope sees the lock through
//! [`Lockfile::realized_for`].

use crate::error::{Error, Result};
use crate::fingerprint::fingerprint;
use crate::scope::{AdapterCapabilities, resolve_scope};
use crate::types::{DesiredState, Descriptor, Scope, ServerMap};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The only lockfile format version
pub const LOCK_VERSION: &str = "1";

/// Default lockfile name
pub const LOCKFILE_NAME: &str = "mcpsync.lock.json";

/// Recorded state of one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEntry {
    pub scope: Scope,
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Descriptor>,
}

/// Durable snapshot of the last-applied desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    pub version: String,
    #[serde(default)]
    pub clients: BTreeSet<String>,
    #[serde(rename = "mcpServers", default)]
    pub entries: BTreeMap<String, LockEntry>,
}

impl Lockfile {
    /// Empty lock for a set of clients
    pub fn new<I, S>(clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version: LOCK_VERSION.to_string(),
            clients: clients.into_iter().map(Into::into).collect(),
            entries: BTreeMap::new(),
        }
    }

    /// Parse lockfile JSON, rejecting unknown versions
    pub fn from_json(text: &str) -> Result<Self> {
        let lock: Lockfile = serde_json::from_str(text)?;
        if lock.version != LOCK_VERSION {
            return Err(Error::UnsupportedLockVersion {
                found: lock.version,
            });
        }
        Ok(lock)
    }

    /// Pretty JSON with a trailing newline
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// Fail unless every selected client is covered by this lock
    pub fn ensure_clients(&self, selected: &[String]) -> Result<()> {
        if selected.iter().all(|c| self.clients.contains(c)) {
            return Ok(());
        }
        Err(Error::LockClientsMismatch {
            lock: self.clients.iter().cloned().collect(),
            selected: selected.to_vec(),
        })
    }

    /// This lock with every entry moved to the scope a client realizes it in
    pub fn realized_for(&self, caps: &AdapterCapabilities) -> Result<Lockfile> {
        let mut realized = self.clone();
        for entry in realized.entries.values_mut() {
            entry.scope = resolve_scope(entry.scope, caps)?.realized;
        }
        Ok(realized)
    }
}

/// Build a lock covering every desired server at `scope`
pub fn build_lock<I, S>(clients: I, desired: &DesiredState, scope: Scope) -> Lockfile
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut lock = Lockfile::new(clients);
    for (name, server) in desired {
        lock.entries.insert(
            name.clone(),
            LockEntry {
                scope,
                fingerprint: fingerprint(server),
                resolved_version: None,
                snapshot: Some(server.clone()),
            },
        );
    }
    lock
}

/// Merge a freshly built lock over a previous one
///
/// Entries of `next` win, entries only in `prev` survive, client sets are
/// unioned, and a missing `resolvedVersion` is inherited from `prev`.
pub fn merge_lock(prev: Option<&Lockfile>, next: Lockfile) -> Lockfile {
    let Some(prev) = prev else {
        return next;
    };

    let mut merged = Lockfile {
        version: LOCK_VERSION.to_string(),
        clients: prev.clients.union(&next.clients).cloned().collect(),
        entries: BTreeMap::new(),
    };

    for (name, entry) in &prev.entries {
        if !next.entries.contains_key(name) {
            merged.entries.insert(name.clone(), entry.clone());
        }
    }

    for (name, mut entry) in next.entries {
        if entry.resolved_version.is_none() {
            entry.resolved_version = prev
                .entries
                .get(&name)
                .and_then(|old| old.resolved_version.clone());
        }
        merged.entries.insert(name, entry);
    }

    log::debug!(
        "Merged lock: {} entr(ies) across {} client(s)",
        merged.entries.len(),
        merged.clients.len()
    );
    merged
}

/// Why a lock entry or live registration disagrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    /// Locked server is registered in neither scope
    Missing,
    /// Registered in the locked scope with a different descriptor
    #[serde(rename = "fingerprint")]
    FingerprintMismatch,
    /// Registered only in the other scope
    #[serde(rename = "scope")]
    ScopeMismatch,
    /// Registered but not in the lock
    Extra,
}

/// What was actually found for a mismatched name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualRegistration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// One drift finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyMismatch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<ActualRegistration>,
    pub reason: MismatchReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    Ok,
    Mismatch,
}

/// Result of verifying a lock against live state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub client: String,
    pub status: VerifyStatus,
    pub mismatches: Vec<VerifyMismatch>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.status == VerifyStatus::Ok
    }

    /// Mismatches with a given reason
    pub fn with_reason(&self, reason: MismatchReason) -> impl Iterator<Item = &VerifyMismatch> {
        self.mismatches.iter().filter(move |m| m.reason == reason)
    }
}

/// Compare a lock with both scopes of one client
///
/// Entry scopes are taken as they are; pass a lock through
/// [`Lockfile::realized_for`] first when the client emulates a scope.
pub fn verify_lock(
    client: &str,
    lock: &Lockfile,
    project: &ServerMap,
    user: &ServerMap,
) -> VerifyReport {
    let by_scope = |scope: Scope| match scope {
        Scope::Project => project,
        Scope::User => user,
    };

    let mut mismatches = Vec::new();

    for (name, entry) in &lock.entries {
        let Some(live) = by_scope(entry.scope).get(name) else {
            let other = entry.scope.other();
            if by_scope(other).contains_key(name) {
                mismatches.push(VerifyMismatch {
                    name: name.clone(),
                    expected_scope: Some(entry.scope),
                    actual: Some(ActualRegistration {
                        scope: Some(other),
                        fingerprint: None,
                    }),
                    reason: MismatchReason::ScopeMismatch,
                });
            } else {
                mismatches.push(VerifyMismatch {
                    name: name.clone(),
                    expected_scope: Some(entry.scope),
                    actual: None,
                    reason: MismatchReason::Missing,
                });
            }
            continue;
        };

        let live_fp = fingerprint(live);
        if live_fp != entry.fingerprint {
            mismatches.push(VerifyMismatch {
                name: name.clone(),
                expected_scope: Some(entry.scope),
                actual: Some(ActualRegistration {
                    scope: Some(entry.scope),
                    fingerprint: Some(live_fp),
                }),
                reason: MismatchReason::FingerprintMismatch,
            });
        }
    }

    for (scope, servers) in [(Scope::Project, project), (Scope::User, user)] {
        for name in servers.keys() {
            if !lock.entries.contains_key(name) {
                mismatches.push(VerifyMismatch {
                    name: name.clone(),
                    expected_scope: None,
                    actual: Some(ActualRegistration {
                        scope: Some(scope),
                        fingerprint: None,
                    }),
                    reason: MismatchReason::Extra,
                });
            }
        }
    }

    let status = if mismatches.is_empty() {
        VerifyStatus::Ok
    } else {
        VerifyStatus::Mismatch
    };
    VerifyReport {
        client: client.to_string(),
        status,
        mismatches,
    }
}

/// Desired state recorded in a lock for one requested scope
///
/// Used when applying from a lock instead of configuration. Every entry
/// recorded for that scope must carry a snapshot.
pub fn desired_from_lock(lock: &Lockfile, scope: Scope) -> Result<DesiredState> {
    let mut desired = DesiredState::new();
    for (name, entry) in lock.entries.iter().filter(|(_, e)| e.scope == scope) {
        let snapshot = entry
            .snapshot
            .clone()
            .ok_or_else(|| Error::SnapshotMissing { name: name.clone() })?;
        desired.insert(name.clone(), snapshot);
    }
    Ok(desired)
}

/// Fail unless every entry of `fresh` is recorded identically in `stored`
///
/// Both locks carry requested scopes, so one check covers every client.
pub fn frozen_check(stored: &Lockfile, fresh: &Lockfile) -> Result<()> {
    let stale: Vec<String> = fresh
        .entries
        .iter()
        .filter(|(name, entry)| {
            stored.entries.get(*name).is_none_or(|old| {
                old.fingerprint != entry.fingerprint || old.scope != entry.scope
            })
        })
        .map(|(name, _)| name.clone())
        .collect();

    if stale.is_empty() {
        Ok(())
    } else {
        Err(Error::LockOutOfDate { names: stale })
    }
}

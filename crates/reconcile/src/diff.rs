//! Plan computation from desired and current state

use crate::fingerprint::fingerprint;
use crate::types::{CurrentState, DesiredState, Descriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PlanAction {
    /// Register a server the client does not have
    Add { name: String, server: Descriptor },
    /// Replace a registration whose fingerprint differs
    Update { name: String, server: Descriptor },
    /// Unregister a server absent from desired state
    Remove { name: String },
    /// Registration already matches
    Skip { name: String },
    /// Add-or-update when current state could not be enumerated
    Apply { name: String, server: Descriptor },
}

/// An ordered list of actions
pub type Plan = Vec<PlanAction>;

impl PlanAction {
    pub fn name(&self) -> &str {
        match self {
            Self::Add { name, .. }
            | Self::Update { name, .. }
            | Self::Remove { name }
            | Self::Skip { name }
            | Self::Apply { name, .. } => name,
        }
    }

    /// Descriptor to write, for actions that write one
    pub fn server(&self) -> Option<&Descriptor> {
        match self {
            Self::Add { server, .. } | Self::Update { server, .. } | Self::Apply { server, .. } => {
                Some(server)
            }
            Self::Remove { .. } | Self::Skip { .. } => None,
        }
    }

    /// Lowercase action label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Update { .. } => "update",
            Self::Remove { .. } => "remove",
            Self::Skip { .. } => "skip",
            Self::Apply { .. } => "apply",
        }
    }

    /// Whether the action touches the client
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Skip { .. })
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Remove { .. })
    }
}

/// Diff desired state against an adapter's reading
///
/// Desired names come first in name order, removals are appended. Names
/// only present in current state are left out entirely unless `prune` is
/// set. An unknown reading asserts every desired server and never prunes.
pub fn diff_desired_current(desired: &DesiredState, current: &CurrentState, prune: bool) -> Plan {
    let Some(current) = current.servers() else {
        log::debug!(
            "Current state unknown, asserting all {} desired server(s)",
            desired.len()
        );
        return desired
            .iter()
            .map(|(name, server)| PlanAction::Apply {
                name: name.clone(),
                server: server.clone(),
            })
            .collect();
    };

    let mut plan = Plan::with_capacity(desired.len());
    for (name, wanted) in desired {
        let action = match current.get(name) {
            None => PlanAction::Add {
                name: name.clone(),
                server: wanted.clone(),
            },
            Some(have) if fingerprint(have) == fingerprint(wanted) => {
                PlanAction::Skip { name: name.clone() }
            }
            Some(_) => PlanAction::Update {
                name: name.clone(),
                server: wanted.clone(),
            },
        };
        plan.push(action);
    }

    if prune {
        plan.extend(
            current
                .keys()
                .filter(|name| !desired.contains_key(*name))
                .map(|name| PlanAction::Remove { name: name.clone() }),
        );
    }

    plan
}

/// Diff against a client that can only list registered names
///
/// Every desired name already present is rewritten as an update.
pub fn diff_by_names(desired: &DesiredState, current_names: &BTreeSet<String>, prune: bool) -> Plan {
    let mut plan: Plan = desired
        .iter()
        .map(|(name, server)| {
            if current_names.contains(name) {
                PlanAction::Update {
                    name: name.clone(),
                    server: server.clone(),
                }
            } else {
                PlanAction::Add {
                    name: name.clone(),
                    server: server.clone(),
                }
            }
        })
        .collect();

    if prune {
        plan.extend(
            current_names
                .iter()
                .filter(|name| !desired.contains_key(*name))
                .map(|name| PlanAction::Remove { name: name.clone() }),
        );
    }

    plan
}

/// Plan summary statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub add: usize,
    pub update: usize,
    pub remove: usize,
    pub skip: usize,
    pub apply: usize,
}

impl PlanSummary {
    pub fn from_plan(plan: &[PlanAction]) -> Self {
        let mut summary = Self::default();
        for action in plan {
            match action {
                PlanAction::Add { .. } => summary.add += 1,
                PlanAction::Update { .. } => summary.update += 1,
                PlanAction::Remove { .. } => summary.remove += 1,
                PlanAction::Skip { .. } => summary.skip += 1,
                PlanAction::Apply { .. } => summary.apply += 1,
            }
        }
        summary
    }

    /// Number of actions that touch the client
    pub fn changes(&self) -> usize {
        self.add + self.update + self.remove + self.apply
    }

    pub fn has_changes(&self) -> bool {
        self.changes() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServerMap;
    use std::collections::BTreeMap;

    fn state(entries: &[(&str, Descriptor)]) -> ServerMap {
        entries
            .iter()
            .map(|(n, d)| (n.to_string(), d.clone()))
            .collect()
    }

    fn labels(plan: &[PlanAction]) -> Vec<(String, &'static str)> {
        plan.iter()
            .map(|a| (a.name().to_string(), a.label()))
            .collect()
    }

    #[test]
    fn test_identical_state_is_all_skip() {
        let desired = state(&[
            ("a", Descriptor::http("https://a")),
            ("b", Descriptor::stdio("echo", ["x"])),
        ]);
        let plan = diff_desired_current(&desired, &CurrentState::Known(desired.clone()), false);
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|a| matches!(a, PlanAction::Skip { .. })));
    }

    #[test]
    fn test_empty_current_is_all_add() {
        let desired = state(&[
            ("a", Descriptor::http("https://a")),
            ("b", Descriptor::stdio("echo", ["x"])),
        ]);
        let plan = diff_desired_current(&desired, &CurrentState::empty(), false);
        assert_eq!(
            labels(&plan),
            vec![("a".to_string(), "add"), ("b".to_string(), "add")]
        );
    }

    #[test]
    fn test_prune_gating() {
        let desired = state(&[("a", Descriptor::http("https://a"))]);
        let current = CurrentState::Known(state(&[
            ("a", Descriptor::http("https://a")),
            ("extra", Descriptor::http("https://extra")),
        ]));

        let kept = diff_desired_current(&desired, &current, false);
        assert_eq!(labels(&kept), vec![("a".to_string(), "skip")]);

        let pruned = diff_desired_current(&desired, &current, true);
        assert_eq!(
            labels(&pruned),
            vec![("a".to_string(), "skip"), ("extra".to_string(), "remove")]
        );
    }

    #[test]
    fn test_changed_url_is_update() {
        let old = state(&[("a", Descriptor::http("https://x"))]);
        let desired = state(&[("a", Descriptor::http("https://y"))]);
        let plan = diff_desired_current(&desired, &CurrentState::Known(old), false);
        assert_eq!(
            plan,
            vec![PlanAction::Update {
                name: "a".into(),
                server: Descriptor::http("https://y"),
            }]
        );
    }

    #[test]
    fn test_empty_headers_in_current_still_skip() {
        let desired = state(&[("a", Descriptor::http("https://a"))]);
        let current = CurrentState::Known(state(&[(
            "a",
            Descriptor::Http {
                url: "https://a".into(),
                headers: Some(BTreeMap::new()),
            },
        )]));
        let plan = diff_desired_current(&desired, &current, true);
        assert_eq!(labels(&plan), vec![("a".to_string(), "skip")]);
    }

    #[test]
    fn test_unknown_current_asserts_everything() {
        let desired = state(&[
            ("a", Descriptor::http("https://a")),
            ("b", Descriptor::http("https://b")),
        ]);
        let plan = diff_desired_current(&desired, &CurrentState::Unknown, true);
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|a| matches!(a, PlanAction::Apply { .. })));
    }

    #[test]
    fn test_diff_by_names_with_prune() {
        let desired = state(&[
            ("github", Descriptor::http("https://api.example/mcp")),
            ("fs", Descriptor::stdio("npx", ["server-fs"])),
        ]);
        let names: BTreeSet<String> = ["github", "extra"].iter().map(|s| s.to_string()).collect();
        let plan = diff_by_names(&desired, &names, true);
        assert_eq!(
            labels(&plan),
            vec![
                ("fs".to_string(), "add"),
                ("github".to_string(), "update"),
                ("extra".to_string(), "remove"),
            ]
        );
    }

    #[test]
    fn test_plan_summary() {
        let plan = vec![
            PlanAction::Add {
                name: "a".into(),
                server: Descriptor::http("https://a"),
            },
            PlanAction::Skip { name: "b".into() },
            PlanAction::Remove { name: "c".into() },
        ];
        let summary = PlanSummary::from_plan(&plan);
        assert_eq!(summary.add, 1);
        assert_eq!(summary.skip, 1);
        assert_eq!(summary.remove, 1);
        assert_eq!(summary.changes(), 2);
        assert!(summary.has_changes());
    }

    #[test]
    fn test_plan_action_json_shape() {
        let action = PlanAction::Add {
            name: "a".into(),
            server: Descriptor::http("https://a"),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "add");
        assert_eq!(json["name"], "a");
        assert_eq!(json["server"]["type"], "http");
    }
}

//! Policy store: validated writes, atomically published snapshots.
//!
//! Writers validate the full rule set and swap in a fresh [`PolicySnapshot`]
//! behind an `Arc`, so an evaluation in flight keeps the set it started
//! with and never observes a half-applied write. Policies that fail
//! validation are excluded whole and reported as diagnostics.

use std::sync::{Arc, PoisonError, RwLock};

use castellan_config::{Diagnostic, PolicyConfig, Severity};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    conditions::Condition,
    types::{Policy, PolicyAction},
};

// ── Snapshot ────────────────────────────────────────────────────────────────

/// Immutable, versioned view of the policy set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicySnapshot {
    policies: Vec<Policy>,
    version: u64,
}

impl PolicySnapshot {
    #[must_use]
    pub fn new(policies: Vec<Policy>, version: u64) -> Self {
        Self { policies, version }
    }

    /// Policies in configured order. Evaluation order (priority, then
    /// configured order) is applied by the engine, not stored here.
    #[must_use]
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// Monotonic counter, bumped on every published write.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

// ── Store ───────────────────────────────────────────────────────────────────

/// Shared policy set with validated writes.
///
/// Reads clone an `Arc` under a briefly-held lock; writes serialize on the
/// same lock for the whole read-validate-publish cycle.
pub struct PolicyStore {
    current: RwLock<Arc<PolicySnapshot>>,
}

impl PolicyStore {
    /// Store seeded per configuration: the built-in default rule set when
    /// `seed_defaults` is on, empty otherwise.
    #[must_use]
    pub fn new(config: &PolicyConfig) -> Self {
        if config.seed_defaults {
            let policies = default_policies();
            info!(count = policies.len(), "seeded default policy set");
            Self {
                current: RwLock::new(Arc::new(PolicySnapshot::new(policies, 1))),
            }
        } else {
            Self::empty()
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            current: RwLock::new(Arc::new(PolicySnapshot::default())),
        }
    }

    /// Current snapshot. Cheap: clones the `Arc`, not the policies.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole policy set. Policies failing validation are
    /// excluded and reported; the accepted remainder is published as one
    /// new snapshot.
    pub fn replace_all(&self, policies: Vec<Policy>) -> Vec<Diagnostic> {
        let (accepted, diagnostics) = validate_policies(policies);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(PolicySnapshot::new(accepted, guard.version() + 1));
        diagnostics
    }

    /// Insert or update one policy by name. When the policy fails
    /// validation the snapshot is left untouched.
    pub fn upsert(&self, policy: Policy) -> Vec<Diagnostic> {
        let name = policy.name.clone();
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.policies().to_vec();
        if let Some(existing) = next.iter_mut().find(|p| p.name == name) {
            *existing = policy;
        } else {
            next.push(policy);
        }
        let (accepted, diagnostics) = validate_policies(next);
        if accepted.iter().any(|p| p.name == name) {
            *guard = Arc::new(PolicySnapshot::new(accepted, guard.version() + 1));
        }
        diagnostics
    }

    /// Remove a policy by name. Returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.policies().to_vec();
        let before = next.len();
        next.retain(|p| p.name != name);
        if next.len() == before {
            return false;
        }
        *guard = Arc::new(PolicySnapshot::new(next, guard.version() + 1));
        true
    }

    /// Load a JSON array of policies, replacing the current set. A policy
    /// that fails to decode (unknown condition tag, wrong types) is rejected
    /// alone; a document-level syntax error changes nothing.
    pub fn load_json(&self, json: &str) -> Vec<Diagnostic> {
        let values: Vec<serde_json::Value> = match serde_json::from_str(json) {
            Ok(values) => values,
            Err(e) => {
                return vec![Diagnostic {
                    severity: Severity::Error,
                    category: "syntax",
                    path: "policies".into(),
                    message: format!("invalid policy document: {e}"),
                }];
            }
        };

        let mut decoded = Vec::new();
        let mut diagnostics = Vec::new();
        for (index, value) in values.into_iter().enumerate() {
            let name_hint = value
                .get("name")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            match serde_json::from_value::<Policy>(value) {
                Ok(policy) => decoded.push(policy),
                Err(e) => diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "type-error",
                    path: name_hint
                        .map_or_else(|| format!("policies[{index}]"), |n| format!("policies.{n}")),
                    message: format!("policy rejected: {e}"),
                }),
            }
        }

        diagnostics.extend(self.replace_all(decoded));
        diagnostics
    }
}

// ── Defaults ────────────────────────────────────────────────────────────────

/// The built-in rule set installed on an empty store. Priorities start at 10
/// so site-specific rules can be slotted in ahead of them.
#[must_use]
pub fn default_policies() -> Vec<Policy> {
    vec![
        Policy::new("high_risk_deny", PolicyAction::Deny)
            .with_description("Deny authentication when the score reaches the high-risk band")
            .with_condition(Condition::ScoreRange { min: 75, max: 100 })
            .with_priority(10),
        Policy::new("medium_risk_stepup", PolicyAction::Stepup)
            .with_description("Require step-up verification for medium-risk attempts")
            .with_condition(Condition::ScoreRange { min: 40, max: 74 })
            .with_priority(11),
        Policy::new("low_risk_allow", PolicyAction::Allow)
            .with_description("Allow low-risk attempts without extra friction")
            .with_condition(Condition::ScoreRange { min: 0, max: 39 })
            .with_priority(12),
    ]
}

// ── Validation ──────────────────────────────────────────────────────────────

/// Validate a full rule set. Policies with errors are dropped; warnings
/// keep the policy. The duplicate check keeps the first occurrence of a
/// name and rejects the rest.
fn validate_policies(policies: Vec<Policy>) -> (Vec<Policy>, Vec<Diagnostic>) {
    let mut accepted: Vec<Policy> = Vec::new();
    let mut diagnostics = Vec::new();

    for policy in policies {
        if policy.name.is_empty() {
            diagnostics.push(semantic(
                Severity::Error,
                "policies".into(),
                "policy name must not be empty".into(),
            ));
            continue;
        }
        let path = format!("policies.{}", policy.name);
        if accepted.iter().any(|p| p.name == policy.name) {
            diagnostics.push(semantic(
                Severity::Error,
                path,
                format!("duplicate policy name \"{}\"", policy.name),
            ));
            continue;
        }

        let mut rejected = false;
        for condition in &policy.conditions {
            match condition {
                Condition::ScoreRange { min, max } if min > max => {
                    diagnostics.push(semantic(
                        Severity::Error,
                        path.clone(),
                        format!("score range inverted (min {min} > max {max})"),
                    ));
                    rejected = true;
                }
                Condition::AllowedCountries { countries } if countries.is_empty() => {
                    diagnostics.push(semantic(
                        Severity::Warning,
                        path.clone(),
                        "empty country list: allowed_countries can never hold".into(),
                    ));
                }
                Condition::BlockedCountries { countries } if countries.is_empty() => {
                    diagnostics.push(semantic(
                        Severity::Warning,
                        path.clone(),
                        "empty country list: blocked_countries always holds".into(),
                    ));
                }
                _ => {}
            }
        }
        if rejected {
            continue;
        }
        accepted.push(policy);
    }

    // An enabled policy with no conditions matches everything, so every
    // enabled policy evaluated after it can never be reached.
    let mut order: Vec<usize> = (0..accepted.len()).filter(|&i| accepted[i].enabled).collect();
    order.sort_by_key(|&i| accepted[i].priority);
    if let Some(pos) = order.iter().position(|&i| accepted[i].conditions.is_empty()) {
        let blocker = accepted[order[pos]].name.clone();
        for &i in &order[pos + 1..] {
            diagnostics.push(semantic(
                Severity::Warning,
                format!("policies.{}", accepted[i].name),
                format!("unreachable: always shadowed by unconditional policy \"{blocker}\""),
            ));
        }
    }

    (accepted, diagnostics)
}

fn semantic(severity: Severity, path: String, message: String) -> Diagnostic {
    Diagnostic {
        severity,
        category: "semantic",
        path,
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn errors(diagnostics: &[Diagnostic]) -> usize {
        diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    #[test]
    fn test_new_store_seeds_defaults() {
        let store = PolicyStore::new(&PolicyConfig::default());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.get("high_risk_deny").is_some());
        assert!(snapshot.get("medium_risk_stepup").is_some());
        assert!(snapshot.get("low_risk_allow").is_some());
    }

    #[test]
    fn test_seeding_can_be_disabled() {
        let config = PolicyConfig {
            seed_defaults: false,
        };
        let store = PolicyStore::new(&config);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_upsert_publishes_new_snapshot() {
        let store = PolicyStore::empty();
        let before = store.snapshot().version();
        let diagnostics = store.upsert(Policy::new("lockdown", PolicyAction::Deny));
        assert_eq!(errors(&diagnostics), 0);
        let after = store.snapshot();
        assert!(after.version() > before);
        assert!(after.get("lockdown").is_some());
    }

    #[test]
    fn test_invalid_upsert_leaves_snapshot_untouched() {
        let store = PolicyStore::empty();
        let before = store.snapshot().version();
        let bad = Policy::new("inverted", PolicyAction::Deny)
            .with_condition(Condition::ScoreRange { min: 80, max: 20 });
        let diagnostics = store.upsert(bad);
        assert_eq!(errors(&diagnostics), 1);
        let after = store.snapshot();
        assert_eq!(after.version(), before);
        assert!(after.get("inverted").is_none());
    }

    #[test]
    fn test_upsert_replaces_by_name() {
        let store = PolicyStore::empty();
        store.upsert(Policy::new("rule", PolicyAction::Allow).with_priority(5));
        store.upsert(Policy::new("rule", PolicyAction::Deny).with_priority(7));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        let rule = snapshot.get("rule").unwrap();
        assert_eq!(rule.action, PolicyAction::Deny);
        assert_eq!(rule.priority, 7);
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let store = PolicyStore::empty();
        let diagnostics = store.replace_all(vec![
            Policy::new("twin", PolicyAction::Allow),
            Policy::new("twin", PolicyAction::Deny),
        ]);
        assert_eq!(errors(&diagnostics), 1);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("twin").unwrap().action, PolicyAction::Allow);
    }

    #[test]
    fn test_empty_name_rejected() {
        let store = PolicyStore::empty();
        let diagnostics = store.replace_all(vec![Policy::new("", PolicyAction::Allow)]);
        assert_eq!(errors(&diagnostics), 1);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_empty_country_list_warns_but_keeps_policy() {
        let store = PolicyStore::empty();
        let diagnostics = store.upsert(
            Policy::new("geo", PolicyAction::Stepup)
                .with_condition(Condition::AllowedCountries { countries: vec![] }),
        );
        assert_eq!(errors(&diagnostics), 0);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert!(store.snapshot().get("geo").is_some());
    }

    #[test]
    fn test_unconditional_policy_shadows_later_rules() {
        let store = PolicyStore::empty();
        let diagnostics = store.replace_all(vec![
            Policy::new("catch_all", PolicyAction::Allow).with_priority(1),
            Policy::new("never_reached", PolicyAction::Deny).with_priority(2),
        ]);
        assert!(diagnostics.iter().any(|d| {
            d.severity == Severity::Warning
                && d.path == "policies.never_reached"
                && d.message.contains("catch_all")
        }));
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_load_json_rejects_single_bad_policy() {
        let store = PolicyStore::empty();
        let diagnostics = store.load_json(
            r#"[
                {"name": "ok", "action": "allow",
                 "conditions": [{"type": "score_range", "min": 0, "max": 39}]},
                {"name": "bad", "action": "deny",
                 "conditions": [{"type": "ip_reputation_below", "value": 10}]}
            ]"#,
        );
        assert_eq!(errors(&diagnostics), 1);
        assert!(diagnostics[0].path.contains("bad"));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("ok").is_some());
    }

    #[test]
    fn test_load_json_syntax_error_changes_nothing() {
        let store = PolicyStore::new(&PolicyConfig::default());
        let before = store.snapshot().version();
        let diagnostics = store.load_json("not json at all");
        assert_eq!(errors(&diagnostics), 1);
        assert_eq!(diagnostics[0].category, "syntax");
        let after = store.snapshot();
        assert_eq!(after.version(), before);
        assert_eq!(after.len(), 3);
    }

    #[test]
    fn test_remove_reports_existence() {
        let store = PolicyStore::new(&PolicyConfig::default());
        assert!(store.remove("low_risk_allow"));
        assert!(!store.remove("low_risk_allow"));
        assert_eq!(store.snapshot().len(), 2);
    }
}

//! Policy evaluation: first matching rule wins, with a built-in fallback so
//! an empty or broken policy set never silently allows a high-risk attempt.

use castellan_risk::{RiskAssessment, RiskFactor, RiskLevel};
use castellan_signals::RiskContext;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    store::PolicySnapshot,
    types::{Policy, PolicyAction},
};

/// Outcome of evaluating an attempt against the active policy set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Name of the rule that matched, or `None` when the built-in fallback
    /// decided.
    pub matched_policy_name: Option<String>,
    pub action: PolicyAction,
    pub score: u32,
    pub level: RiskLevel,
    /// The factors behind the score, evidence included.
    pub factors: Vec<RiskFactor>,
}

impl PolicyDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.action == PolicyAction::Allow
    }

    #[must_use]
    pub fn requires_stepup(&self) -> bool {
        self.action == PolicyAction::Stepup
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        self.action == PolicyAction::Deny
    }
}

/// Fallback action when no policy matches, keyed off the risk level alone.
#[must_use]
pub fn fallback_action(level: RiskLevel) -> PolicyAction {
    match level {
        RiskLevel::Low => PolicyAction::Allow,
        RiskLevel::Medium => PolicyAction::Stepup,
        RiskLevel::High => PolicyAction::Deny,
    }
}

/// Decide the action for a scored attempt.
///
/// Enabled policies are evaluated in ascending priority order (stable, so
/// equal priorities keep their configured order) and the first one whose
/// conditions all hold supplies the action. With no match the fallback
/// mapping applies. Pure: the same inputs always yield the same decision.
#[must_use]
pub fn decide(
    assessment: &RiskAssessment,
    context: &RiskContext,
    snapshot: &PolicySnapshot,
) -> PolicyDecision {
    let mut active: Vec<&Policy> = snapshot.policies().iter().filter(|p| p.enabled).collect();
    active.sort_by_key(|p| p.priority);

    for policy in active {
        if policy
            .conditions
            .iter()
            .all(|condition| condition.holds(assessment, context))
        {
            debug!(
                subject_id = %context.subject_id,
                policy = %policy.name,
                action = %policy.action,
                score = assessment.total_score,
                "policy matched"
            );
            return PolicyDecision {
                matched_policy_name: Some(policy.name.clone()),
                action: policy.action,
                score: assessment.total_score,
                level: assessment.level,
                factors: assessment.factors.clone(),
            };
        }
    }

    let action = fallback_action(assessment.level);
    debug!(
        subject_id = %context.subject_id,
        action = %action,
        score = assessment.total_score,
        "no policy matched, fallback applied"
    );
    PolicyDecision {
        matched_policy_name: None,
        action,
        score: assessment.total_score,
        level: assessment.level,
        factors: assessment.factors.clone(),
    }
}

//! Audit event payloads.
//!
//! One event per engine operation, carrying everything an operator needs to
//! reconstruct the decision afterwards: the full factor breakdown with
//! evidence, the matched policy, and any signals that were degraded at
//! collection time.

use castellan_policy::PolicyAction;
use castellan_risk::{RiskFactor, RiskLevel};
use castellan_stepup::VerificationMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typed payload for each audited operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// An attempt was scored and decided.
    RiskEvaluated {
        subject_id: String,
        timestamp: DateTime<Utc>,
        score: u32,
        level: RiskLevel,
        action: PolicyAction,
        /// `None` when the built-in fallback decided.
        matched_policy: Option<String>,
        factors: Vec<RiskFactor>,
        /// Signals that were missing or unusable during collection.
        degradations: Vec<String>,
    },
    /// A step-up challenge was opened for a subject.
    #[serde(rename = "stepup_created")]
    StepUpCreated {
        subject_id: String,
        challenge_id: String,
        score: u32,
        level: RiskLevel,
        factors: Vec<RiskFactor>,
        expires_at: DateTime<Utc>,
    },
    /// A challenge was satisfied with a valid proof.
    #[serde(rename = "stepup_verified")]
    StepUpVerified {
        subject_id: String,
        challenge_id: String,
        method: VerificationMethod,
        score: u32,
        level: RiskLevel,
        factors: Vec<RiskFactor>,
    },
    /// A challenge outlived its deadline; recorded when the expiry is
    /// first observed.
    #[serde(rename = "stepup_expired")]
    StepUpExpired {
        subject_id: String,
        challenge_id: String,
        score: u32,
        level: RiskLevel,
        factors: Vec<RiskFactor>,
        expired_at: DateTime<Utc>,
    },
    /// A verification attempt failed; `reason` is the outcome label.
    #[serde(rename = "stepup_failed")]
    StepUpFailed {
        subject_id: Option<String>,
        challenge_id: String,
        reason: String,
    },
    /// A pending challenge was cancelled by the caller.
    #[serde(rename = "stepup_cancelled")]
    StepUpCancelled {
        subject_id: Option<String>,
        challenge_id: String,
    },
}

impl AuditEvent {
    /// Stable label of the event, identical to its serialized `event` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RiskEvaluated { .. } => "risk_evaluated",
            Self::StepUpCreated { .. } => "stepup_created",
            Self::StepUpVerified { .. } => "stepup_verified",
            Self::StepUpExpired { .. } => "stepup_expired",
            Self::StepUpFailed { .. } => "stepup_failed",
            Self::StepUpCancelled { .. } => "stepup_cancelled",
        }
    }

    /// The subject this event concerns, when known.
    #[must_use]
    pub fn subject_id(&self) -> Option<&str> {
        match self {
            Self::RiskEvaluated { subject_id, .. }
            | Self::StepUpCreated { subject_id, .. }
            | Self::StepUpVerified { subject_id, .. }
            | Self::StepUpExpired { subject_id, .. } => Some(subject_id),
            Self::StepUpFailed { subject_id, .. } | Self::StepUpCancelled { subject_id, .. } => {
                subject_id.as_deref()
            }
        }
    }
}

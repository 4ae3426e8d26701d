//! Step-up challenge records and their lifecycle states.

use std::fmt;

use castellan_risk::{AssessmentSummary, RiskAssessment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a challenge. `Pending` is the only state that can
/// still move; the other three are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeState {
    Pending,
    Verified,
    Expired,
    Cancelled,
}

impl ChallengeState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ChallengeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a proof can satisfy a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    Otp,
    Pin,
    Biometric,
}

impl VerificationMethod {
    /// Every method a fresh challenge accepts.
    pub const ALL: [Self; 3] = [Self::Otp, Self::Pin, Self::Biometric];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Otp => "otp",
            Self::Pin => "pin",
            Self::Biometric => "biometric",
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side record of one step-up challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUpChallenge {
    pub challenge_id: String,
    pub subject_id: String,
    /// The assessment that triggered the step-up, kept whole for the audit
    /// trail.
    pub original_risk_assessment: RiskAssessment,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: ChallengeState,
    /// Method that satisfied the challenge, set when it reaches `verified`.
    pub verification_method: Option<VerificationMethod>,
    /// Code the caller delivers to the subject out of band.
    pub otp_code: String,
}

/// What the caller gets back at creation time: the identifier, the expiry,
/// the accepted methods, the one-time code to deliver out of band, and a
/// redacted view of the assessment behind the challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeHandle {
    pub challenge_id: String,
    pub subject_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub methods: Vec<VerificationMethod>,
    pub otp_code: String,
    pub assessment: AssessmentSummary,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_states_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ChallengeState::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(
            serde_json::to_string(&ChallengeState::Pending).unwrap(),
            "\"pending\""
        );
    }

    #[test]
    fn test_methods_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&VerificationMethod::Biometric).unwrap(),
            "\"biometric\""
        );
    }

    #[test]
    fn test_only_pending_is_non_terminal() {
        assert!(!ChallengeState::Pending.is_terminal());
        assert!(ChallengeState::Verified.is_terminal());
        assert!(ChallengeState::Expired.is_terminal());
        assert!(ChallengeState::Cancelled.is_terminal());
    }
}

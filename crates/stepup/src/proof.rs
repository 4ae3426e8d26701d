//! Proof material supplied on verification attempts.

use serde::{Deserialize, Serialize};

use crate::challenge::VerificationMethod;

/// Proof for one verification attempt, tagged by method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ChallengeProof {
    Otp { code: String },
    Pin { pin: String },
    Biometric { assertion: String },
}

impl ChallengeProof {
    /// The method this proof is of.
    #[must_use]
    pub fn method(&self) -> VerificationMethod {
        match self {
            Self::Otp { .. } => VerificationMethod::Otp,
            Self::Pin { .. } => VerificationMethod::Pin,
            Self::Biometric { .. } => VerificationMethod::Biometric,
        }
    }
}

//! Challenge lifecycle coordination.
//!
//! One record per challenge id in a concurrent map. Transitions on a record
//! happen under its map entry lock, so two verifications of the same id
//! serialize while distinct ids proceed independently. Expiry is evaluated
//! against the clock on every read; the sweep only reclaims memory.

use castellan_config::StepUpConfig;
use castellan_risk::RiskAssessment;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    challenge::{ChallengeHandle, ChallengeState, StepUpChallenge, VerificationMethod},
    proof::ChallengeProof,
};

/// Outcome of a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyOutcome {
    /// Proof accepted; the challenge is now `verified`.
    Verified,
    /// No challenge under that identifier.
    NotFound,
    /// The challenge already reached `verified` or `cancelled`.
    AlreadyUsed,
    /// The TTL elapsed; the record is marked `expired`.
    Expired,
    /// The supplied proof is not of the declared method's kind.
    MethodMismatch,
    /// Structurally invalid proof; the challenge stays `pending`.
    InvalidProof,
}

impl VerifyOutcome {
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Verified
    }

    /// Stable label for logs and audit events.
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::NotFound => "not_found",
            Self::AlreadyUsed => "already_used",
            Self::Expired => "expired",
            Self::MethodMismatch => "method_mismatch",
            Self::InvalidProof => "invalid_proof",
        }
    }
}

/// Outcome of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The pending challenge is now `cancelled`.
    Cancelled,
    /// The challenge was already terminal; nothing changed.
    AlreadyTerminal,
    /// No challenge under that identifier.
    NotFound,
}

/// Coordinates step-up challenges from creation to a terminal state.
///
/// Settled records stay in the map until their TTL passes, so a second
/// verification of a used challenge reports `already_used` rather than
/// vanishing into `not_found`.
pub struct ChallengeCoordinator {
    config: StepUpConfig,
    challenges: DashMap<String, StepUpChallenge>,
}

impl ChallengeCoordinator {
    #[must_use]
    pub fn new(config: StepUpConfig) -> Self {
        Self {
            config,
            challenges: DashMap::new(),
        }
    }

    /// Open a challenge for a subject whose attempt was decided `stepup`.
    /// The handle carries the one-time code for out-of-band delivery.
    pub fn create(&self, subject_id: &str, assessment: &RiskAssessment) -> ChallengeHandle {
        self.create_at(subject_id, assessment, Utc::now())
    }

    pub fn create_at(
        &self,
        subject_id: &str,
        assessment: &RiskAssessment,
        now: DateTime<Utc>,
    ) -> ChallengeHandle {
        let challenge_id = Uuid::new_v4().to_string();
        let otp_code = generate_otp(self.config.otp_digits);
        let expires_at = now + Duration::seconds(self.config.ttl_secs as i64);

        let challenge = StepUpChallenge {
            challenge_id: challenge_id.clone(),
            subject_id: subject_id.to_string(),
            original_risk_assessment: assessment.clone(),
            created_at: now,
            expires_at,
            state: ChallengeState::Pending,
            verification_method: None,
            otp_code: otp_code.clone(),
        };
        let handle = ChallengeHandle {
            challenge_id: challenge_id.clone(),
            subject_id: subject_id.to_string(),
            created_at: now,
            expires_at,
            methods: VerificationMethod::ALL.to_vec(),
            otp_code,
            assessment: assessment.summary(),
        };
        debug!(
            challenge_id,
            subject_id,
            score = assessment.total_score,
            "step-up challenge created"
        );
        self.challenges.insert(challenge_id, challenge);
        handle
    }

    /// Look up a challenge. Reads are expiry-aware: a pending record whose
    /// TTL has passed is marked `expired` before it is returned.
    #[must_use]
    pub fn get(&self, challenge_id: &str) -> Option<StepUpChallenge> {
        self.get_at(challenge_id, Utc::now())
    }

    #[must_use]
    pub fn get_at(&self, challenge_id: &str, now: DateTime<Utc>) -> Option<StepUpChallenge> {
        let mut entry = self.challenges.get_mut(challenge_id)?;
        if entry.state == ChallengeState::Pending && now > entry.expires_at {
            entry.state = ChallengeState::Expired;
        }
        Some(entry.clone())
    }

    /// Verify a challenge with the declared method and its proof.
    pub fn verify(
        &self,
        challenge_id: &str,
        method: VerificationMethod,
        proof: &ChallengeProof,
    ) -> VerifyOutcome {
        self.verify_at(challenge_id, method, proof, Utc::now())
    }

    /// Clock-explicit variant of [`verify`](Self::verify). Fails closed:
    /// every failure leaves the record either untouched or marked `expired`,
    /// and a correct proof after the TTL still reports `expired`.
    pub fn verify_at(
        &self,
        challenge_id: &str,
        method: VerificationMethod,
        proof: &ChallengeProof,
        now: DateTime<Utc>,
    ) -> VerifyOutcome {
        let Some(mut entry) = self.challenges.get_mut(challenge_id) else {
            return VerifyOutcome::NotFound;
        };
        match entry.state {
            ChallengeState::Verified | ChallengeState::Cancelled => VerifyOutcome::AlreadyUsed,
            ChallengeState::Expired => VerifyOutcome::Expired,
            ChallengeState::Pending => {
                if now > entry.expires_at {
                    entry.state = ChallengeState::Expired;
                    return VerifyOutcome::Expired;
                }
                if proof.method() != method {
                    return VerifyOutcome::MethodMismatch;
                }
                if !self.proof_accepted(&entry, proof) {
                    debug!(challenge_id, method = %method, "step-up proof rejected");
                    return VerifyOutcome::InvalidProof;
                }
                entry.state = ChallengeState::Verified;
                entry.verification_method = Some(method);
                debug!(challenge_id, method = %method, "step-up challenge verified");
                VerifyOutcome::Verified
            }
        }
    }

    /// Cancel a pending challenge. Idempotent on terminal records.
    pub fn cancel(&self, challenge_id: &str) -> CancelOutcome {
        self.cancel_at(challenge_id, Utc::now())
    }

    pub fn cancel_at(&self, challenge_id: &str, now: DateTime<Utc>) -> CancelOutcome {
        let Some(mut entry) = self.challenges.get_mut(challenge_id) else {
            return CancelOutcome::NotFound;
        };
        match entry.state {
            ChallengeState::Pending if now > entry.expires_at => {
                entry.state = ChallengeState::Expired;
                CancelOutcome::AlreadyTerminal
            }
            ChallengeState::Pending => {
                entry.state = ChallengeState::Cancelled;
                debug!(challenge_id, "step-up challenge cancelled");
                CancelOutcome::Cancelled
            }
            _ => CancelOutcome::AlreadyTerminal,
        }
    }

    /// Drop records whose TTL has elapsed, whatever their state. Memory
    /// reclamation only: expiry is enforced at read time, never by this
    /// sweep. Returns how many records were removed.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.challenges.len();
        self.challenges.retain(|_, challenge| now <= challenge.expires_at);
        before.saturating_sub(self.challenges.len())
    }

    /// Number of records currently held, terminal ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    /// Number of records still `pending`. Records past their deadline count
    /// until the expiry is observed by a read.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.challenges
            .iter()
            .filter(|entry| entry.state == ChallengeState::Pending)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    fn proof_accepted(&self, challenge: &StepUpChallenge, proof: &ChallengeProof) -> bool {
        match proof {
            ChallengeProof::Otp { code } => *code == challenge.otp_code,
            ChallengeProof::Pin { pin } => {
                pin.len() >= self.config.min_pin_len
                    && pin.chars().all(|c| c.is_ascii_digit())
            }
            ChallengeProof::Biometric { assertion } => !assertion.is_empty(),
        }
    }
}

/// Random numeric code with the given number of digits, leading digit 1-9.
fn generate_otp(digits: u32) -> String {
    let digits = digits.clamp(4, 10);
    let low = 10u64.pow(digits - 1);
    let high = 10u64.pow(digits);
    rand::rng().random_range(low..high).to_string()
}

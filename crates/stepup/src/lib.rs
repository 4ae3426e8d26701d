//! Step-up challenge lifecycle for risk-scored authentication attempts.
//!
//! When a policy decision asks for step-up, the caller opens a challenge
//! here, delivers the one-time code out of band, and later verifies the
//! subject's proof. Challenges move `pending -> {verified, expired,
//! cancelled}` and never leave a terminal state; expiry is checked against
//! the clock on every read, so a stale record can never verify.

pub mod challenge;
pub mod coordinator;
pub mod proof;

pub use {
    challenge::{ChallengeHandle, ChallengeState, StepUpChallenge, VerificationMethod},
    coordinator::{CancelOutcome, ChallengeCoordinator, VerifyOutcome},
    proof::ChallengeProof,
};

//! Risk scoring for authentication attempts.
//!
//! The scorer evaluates a fixed set of weighted factors against the context
//! snapshot collected for an attempt and produces a [`RiskAssessment`]: the
//! triggered factors with their evidence, a total score capped at 100, and
//! a low/medium/high level derived from configured thresholds.

pub mod assessment;
pub mod scorer;
pub mod travel;

pub use {
    assessment::{AssessmentSummary, MAX_SCORE, RiskAssessment, RiskFactor, RiskLevel},
    scorer::{
        FACTOR_FLAGGED_NETWORK, FACTOR_IMPOSSIBLE_TRAVEL, FACTOR_NEW_LOCATION,
        FACTOR_OUTSIDE_HOURS, FACTOR_REPEATED_FAILURES, FACTOR_UNKNOWN_DEVICE, RiskScorer,
    },
    travel::{ImpliedTravel, haversine_km, implied_travel},
};

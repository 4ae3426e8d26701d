//! Policy condition predicates.
//!
//! Conditions are a closed, tagged set: each variant is a pure predicate
//! over the scored assessment and the attempt context. The serde `type` tag
//! is the extension point; payloads with an unknown tag fail to decode and
//! are rejected when the policy is written, never during evaluation.

use castellan_risk::RiskAssessment;
use castellan_signals::RiskContext;
use serde::{Deserialize, Serialize};

/// One predicate in a policy's condition set.
///
/// Both country conditions require a resolved country: an attempt whose
/// origin could not be resolved satisfies neither, so policies gated on
/// geography never match blind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Total score within `min..=max`, both ends inclusive.
    ScoreRange { min: u32, max: u32 },
    /// Resolved country is one of the listed codes.
    AllowedCountries { countries: Vec<String> },
    /// Resolved country is known and not among the listed codes.
    BlockedCountries { countries: Vec<String> },
    /// Attempt falls inside the configured business-hours window.
    BusinessHoursOnly,
    /// Device fingerprint is enrolled for the subject.
    KnownDeviceOnly,
}

impl Condition {
    /// Evaluate the predicate. Pure: no I/O, no clock reads.
    #[must_use]
    pub fn holds(&self, assessment: &RiskAssessment, context: &RiskContext) -> bool {
        match self {
            Self::ScoreRange { min, max } => (*min..=*max).contains(&assessment.total_score),
            Self::AllowedCountries { countries } => context
                .country()
                .is_some_and(|country| contains_country(countries, country)),
            Self::BlockedCountries { countries } => context
                .country()
                .is_some_and(|country| !contains_country(countries, country)),
            Self::BusinessHoursOnly => context.is_business_hours,
            Self::KnownDeviceOnly => context.known_device,
        }
    }

    /// Stable tag of the variant, matching its serialized `type`.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ScoreRange { .. } => "score_range",
            Self::AllowedCountries { .. } => "allowed_countries",
            Self::BlockedCountries { .. } => "blocked_countries",
            Self::BusinessHoursOnly => "business_hours_only",
            Self::KnownDeviceOnly => "known_device_only",
        }
    }
}

fn contains_country(countries: &[String], country: &str) -> bool {
    countries.iter().any(|c| c.eq_ignore_ascii_case(country))
}

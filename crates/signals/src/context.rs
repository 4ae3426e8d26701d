//! Per-attempt context types consumed by the risk scorer.

use std::net::IpAddr;

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Coarse location resolved for the attempt's source address.
///
/// Country codes are ISO 3166-1 alpha-2. Coordinates are optional; the
/// travel-velocity signal only engages when both ends have them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResolvedLocation {
    pub country: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ResolvedLocation {
    /// Lat/lon pair when both coordinates are present.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Short display label for evidence strings and logs.
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.country, &self.region) {
            (Some(country), Some(region)) => format!("{country}/{region}"),
            (Some(country), None) => country.clone(),
            _ => "unresolved".to_string(),
        }
    }
}

/// A located observation at a point in time, used for velocity checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
}

/// Immutable snapshot of one authentication attempt.
///
/// Built once by the [`SignalCollector`](crate::SignalCollector) and then
/// owned by the evaluation pipeline for the duration of the request. Scoring
/// reads it; nothing mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContext {
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub source_ip: Option<IpAddr>,
    pub resolved_location: Option<ResolvedLocation>,
    pub device_fingerprint: Option<String>,
    /// Derived from `timestamp` and the configured business-hours window.
    pub is_business_hours: bool,
    /// Failed attempts for this subject inside the trailing window.
    pub recent_failed_attempts: u32,
    pub known_device: bool,
    pub known_location: bool,
    /// Distinct enrolled device fingerprints on record for the subject.
    pub known_device_count: usize,
    /// Distinct countries on record for the subject.
    pub known_location_count: usize,
    /// Most recent successful located attempt, for the velocity check.
    pub previous_location_and_time: Option<LocationFix>,
    /// Reason string when the network-intel collaborator flagged the origin.
    pub network_flag: Option<String>,
    /// Inputs that were missing or unusable at collection time. Carried
    /// through to the audit event so degraded evaluations are visible.
    pub degradations: Vec<String>,
}

impl RiskContext {
    /// Current coordinates, when the resolved location carries them.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.resolved_location
            .as_ref()
            .and_then(ResolvedLocation::coordinates)
    }

    /// Current country code, when resolved.
    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.resolved_location
            .as_ref()
            .and_then(|l| l.country.as_deref())
    }
}

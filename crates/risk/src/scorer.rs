//! Additive risk scorer. Evaluates a fixed set of factors against the
//! collected context, each contributing configured points when it triggers.

use castellan_config::RiskConfig;
use castellan_signals::RiskContext;
use tracing::debug;

use crate::{
    assessment::{RiskAssessment, RiskFactor},
    travel::implied_travel,
};

pub const FACTOR_NEW_LOCATION: &str = "new_location";
pub const FACTOR_OUTSIDE_HOURS: &str = "outside_hours";
pub const FACTOR_REPEATED_FAILURES: &str = "repeated_failures";
pub const FACTOR_UNKNOWN_DEVICE: &str = "unknown_device";
pub const FACTOR_IMPOSSIBLE_TRAVEL: &str = "impossible_travel";
pub const FACTOR_FLAGGED_NETWORK: &str = "flagged_network";

/// Stateless scorer over an immutable context snapshot.
///
/// Scoring is deterministic: the same context and configuration always
/// produce the same assessment, factor for factor.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    config: RiskConfig,
}

impl RiskScorer {
    #[must_use]
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Score one authentication attempt.
    #[must_use]
    pub fn score(&self, context: &RiskContext) -> RiskAssessment {
        let factors: Vec<RiskFactor> = [
            self.new_location(context),
            self.outside_hours(context),
            self.repeated_failures(context),
            self.unknown_device(context),
            self.impossible_travel(context),
            self.flagged_network(context),
        ]
        .into_iter()
        .flatten()
        .collect();

        let assessment = RiskAssessment::from_factors(
            factors,
            &self.config.thresholds,
            context.degradations.clone(),
        );
        debug!(
            subject_id = %context.subject_id,
            score = assessment.total_score,
            level = %assessment.level,
            factors = assessment.factors.len(),
            "scored authentication attempt"
        );
        assessment
    }

    fn new_location(&self, context: &RiskContext) -> Option<RiskFactor> {
        if context.known_location {
            return None;
        }
        let country = context.country().unwrap_or("unresolved");
        let evidence = if context.known_location_count == 0 {
            format!("first observed location for subject ({country})")
        } else {
            format!(
                "{country} not among {} locations on record",
                context.known_location_count
            )
        };
        Some(RiskFactor::new(
            FACTOR_NEW_LOCATION,
            self.config.factors.new_location,
            evidence,
        ))
    }

    fn outside_hours(&self, context: &RiskContext) -> Option<RiskFactor> {
        if context.is_business_hours {
            return None;
        }
        let hours = &self.config.business_hours;
        Some(RiskFactor::new(
            FACTOR_OUTSIDE_HOURS,
            self.config.factors.outside_hours,
            format!(
                "attempt outside business hours ({:02}:00-{:02}:00 {})",
                hours.start_hour, hours.end_hour, hours.timezone
            ),
        ))
    }

    fn repeated_failures(&self, context: &RiskContext) -> Option<RiskFactor> {
        if context.recent_failed_attempts < self.config.failure_threshold {
            return None;
        }
        Some(RiskFactor::new(
            FACTOR_REPEATED_FAILURES,
            self.config.factors.repeated_failures,
            format!(
                "{} failed attempts in the trailing {}s window",
                context.recent_failed_attempts, self.config.failure_window_secs
            ),
        ))
    }

    fn unknown_device(&self, context: &RiskContext) -> Option<RiskFactor> {
        if context.known_device {
            return None;
        }
        let evidence = if context.known_device_count == 0 {
            "first observed device for subject".to_string()
        } else {
            format!(
                "fingerprint not among {} devices on record",
                context.known_device_count
            )
        };
        Some(RiskFactor::new(
            FACTOR_UNKNOWN_DEVICE,
            self.config.factors.unknown_device,
            evidence,
        ))
    }

    /// Flags when the implied speed from the previous fix exceeds the
    /// configured limit. Fixes closer than `minor_travel_km` never flag, and
    /// an absent previous fix or unresolved current location is a non-trigger.
    fn impossible_travel(&self, context: &RiskContext) -> Option<RiskFactor> {
        let previous = context.previous_location_and_time.as_ref()?;
        let (latitude, longitude) = context.coordinates()?;
        let travel = implied_travel(previous, latitude, longitude, context.timestamp);
        if travel.distance_km < self.config.minor_travel_km {
            return None;
        }
        let evidence = match travel.speed_kmh {
            Some(speed) if speed > self.config.impossible_speed_kmh => format!(
                "implied speed {speed:.0} km/h over {:.0} km exceeds {:.0} km/h",
                travel.distance_km, self.config.impossible_speed_kmh
            ),
            // No elapsed time: any distance past the minor-travel floor is
            // unreachable.
            None => format!(
                "{:.0} km between fixes with no elapsed time",
                travel.distance_km
            ),
            Some(_) => return None,
        };
        Some(RiskFactor::new(
            FACTOR_IMPOSSIBLE_TRAVEL,
            self.config.factors.impossible_travel,
            evidence,
        ))
    }

    fn flagged_network(&self, context: &RiskContext) -> Option<RiskFactor> {
        let flag = context.network_flag.as_ref()?;
        Some(RiskFactor::new(
            FACTOR_FLAGGED_NETWORK,
            self.config.factors.flagged_network,
            flag.clone(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use castellan_signals::{LocationFix, ResolvedLocation};
    use chrono::{Duration, Utc};

    use super::*;
    use crate::assessment::RiskLevel;

    /// Context for an attempt that trips no factor: enrolled device and
    /// location, inside business hours, clean network, no failures.
    fn quiet_context() -> RiskContext {
        RiskContext {
            subject_id: "subject-1".into(),
            timestamp: Utc::now(),
            source_ip: Some("203.0.113.10".parse().unwrap()),
            resolved_location: Some(ResolvedLocation {
                country: Some("FR".into()),
                region: Some("Paris".into()),
                latitude: Some(48.8566),
                longitude: Some(2.3522),
            }),
            device_fingerprint: Some("fp-1".into()),
            is_business_hours: true,
            recent_failed_attempts: 0,
            known_device: true,
            known_location: true,
            known_device_count: 2,
            known_location_count: 1,
            previous_location_and_time: None,
            network_flag: None,
            degradations: Vec::new(),
        }
    }

    fn scorer() -> RiskScorer {
        RiskScorer::new(RiskConfig::default())
    }

    #[test]
    fn test_quiet_context_scores_zero() {
        let assessment = scorer().score(&quiet_context());
        assert_eq!(assessment.total_score, 0);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_new_location_scores_thirty() {
        let context = RiskContext {
            known_location: false,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert_eq!(assessment.total_score, 30);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.triggered(FACTOR_NEW_LOCATION));
        assert!(assessment.factors[0].evidence.contains("FR"));
    }

    #[test]
    fn test_unknown_device_outside_hours_scores_thirty_five() {
        let context = RiskContext {
            known_device: false,
            is_business_hours: false,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert_eq!(assessment.total_score, 35);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.triggered(FACTOR_UNKNOWN_DEVICE));
        assert!(assessment.triggered(FACTOR_OUTSIDE_HOURS));
    }

    #[test]
    fn test_new_location_device_and_failures_scores_seventy_five() {
        let context = RiskContext {
            known_location: false,
            known_device: false,
            recent_failed_attempts: 3,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert_eq!(assessment.total_score, 75);
        assert_eq!(assessment.level, RiskLevel::High);
    }

    #[test]
    fn test_new_location_outside_hours_scores_forty_five() {
        let context = RiskContext {
            known_location: false,
            is_business_hours: false,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert_eq!(assessment.total_score, 45);
        assert_eq!(assessment.level, RiskLevel::Medium);
    }

    #[test]
    fn test_all_factors_cap_at_one_hundred() {
        let now = Utc::now();
        let context = RiskContext {
            known_location: false,
            known_device: false,
            is_business_hours: false,
            recent_failed_attempts: 5,
            previous_location_and_time: Some(LocationFix {
                latitude: 35.6762,
                longitude: 139.6503,
                observed_at: now - Duration::hours(1),
            }),
            network_flag: Some("listed on blocklist".into()),
            timestamp: now,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert_eq!(assessment.factors.len(), 6);
        assert_eq!(assessment.total_score, 100);
        assert_eq!(assessment.level, RiskLevel::High);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let context = RiskContext {
            known_location: false,
            recent_failed_attempts: 4,
            ..quiet_context()
        };
        let s = scorer();
        let first = s.score(&context);
        let second = s.score(&context);
        assert_eq!(first, second);
    }

    #[test]
    fn test_failures_below_threshold_do_not_trigger() {
        let context = RiskContext {
            recent_failed_attempts: 2,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert!(!assessment.triggered(FACTOR_REPEATED_FAILURES));

        let context = RiskContext {
            recent_failed_attempts: 3,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert!(assessment.triggered(FACTOR_REPEATED_FAILURES));
    }

    #[test]
    fn test_impossible_travel_triggers_on_speed() {
        let now = Utc::now();
        // Tokyo an hour ago, Paris now: ~9700 km/h implied.
        let context = RiskContext {
            previous_location_and_time: Some(LocationFix {
                latitude: 35.6762,
                longitude: 139.6503,
                observed_at: now - Duration::hours(1),
            }),
            timestamp: now,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert_eq!(assessment.total_score, 35);
        assert!(assessment.triggered(FACTOR_IMPOSSIBLE_TRAVEL));
    }

    #[test]
    fn test_plausible_travel_does_not_trigger() {
        let now = Utc::now();
        // London an hour ago, Paris now: ~340 km/h.
        let context = RiskContext {
            previous_location_and_time: Some(LocationFix {
                latitude: 51.5074,
                longitude: -0.1278,
                observed_at: now - Duration::hours(1),
            }),
            timestamp: now,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert!(!assessment.triggered(FACTOR_IMPOSSIBLE_TRAVEL));
    }

    #[test]
    fn test_minor_travel_never_flags() {
        let now = Utc::now();
        // ~50 km in one minute implies ~3000 km/h, but the distance is below
        // the minor-travel floor.
        let context = RiskContext {
            previous_location_and_time: Some(LocationFix {
                latitude: 48.4,
                longitude: 2.3522,
                observed_at: now - Duration::minutes(1),
            }),
            timestamp: now,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert!(!assessment.triggered(FACTOR_IMPOSSIBLE_TRAVEL));
    }

    #[test]
    fn test_same_timestamp_distant_fix_triggers() {
        let now = Utc::now();
        let context = RiskContext {
            previous_location_and_time: Some(LocationFix {
                latitude: 35.6762,
                longitude: 139.6503,
                observed_at: now,
            }),
            timestamp: now,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert!(assessment.triggered(FACTOR_IMPOSSIBLE_TRAVEL));
        assert!(assessment.factors[0].evidence.contains("no elapsed time"));
    }

    #[test]
    fn test_no_previous_fix_does_not_trigger_travel() {
        let context = RiskContext {
            previous_location_and_time: None,
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert!(!assessment.triggered(FACTOR_IMPOSSIBLE_TRAVEL));
    }

    #[test]
    fn test_network_flag_carries_reason_as_evidence() {
        let context = RiskContext {
            network_flag: Some("scanning tool in user agent: sqlmap".into()),
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert_eq!(assessment.total_score, 40);
        assert_eq!(
            assessment.factors[0].evidence,
            "scanning tool in user agent: sqlmap"
        );
    }

    #[test]
    fn test_degradations_carry_into_assessment() {
        let context = RiskContext {
            degradations: vec!["source ip missing: network origin unchecked".into()],
            ..quiet_context()
        };
        let assessment = scorer().score(&context);
        assert!(assessment.is_degraded());
        assert_eq!(assessment.degradations.len(), 1);
    }

    #[test]
    fn test_configured_points_are_honored() {
        let config = RiskConfig {
            factors: castellan_config::FactorPoints {
                new_location: 50,
                ..castellan_config::FactorPoints::default()
            },
            ..RiskConfig::default()
        };
        let context = RiskContext {
            known_location: false,
            ..quiet_context()
        };
        let assessment = RiskScorer::new(config).score(&context);
        assert_eq!(assessment.total_score, 50);
    }
}

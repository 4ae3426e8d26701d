//! Config schema types for the risk engine: scoring thresholds and factor
//! points, business-hours window, step-up TTL, audit and metrics toggles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CastellanConfig {
    pub risk: RiskConfig,
    pub policy: PolicyConfig,
    pub stepup: StepUpConfig,
    pub audit: AuditConfig,
    pub metrics: MetricsConfig,
}

// ── Risk scoring ────────────────────────────────────────────────────────────

/// Risk scorer configuration: level thresholds, per-factor points, and the
/// signal windows the factors evaluate against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub thresholds: LevelThresholds,
    pub factors: FactorPoints,
    /// Trailing window for counting failed attempts, in seconds.
    pub failure_window_secs: u64,
    /// Failed attempts at or above this count trigger the repeated-failures factor.
    pub failure_threshold: u32,
    /// Implied travel speed above this flags impossible travel (km/h).
    pub impossible_speed_kmh: f64,
    /// Location fixes closer than this never flag travel, whatever the elapsed time (km).
    pub minor_travel_km: f64,
    /// How to score a subject with no recorded history for a signal.
    pub unknown_history: UnknownHistory,
    pub business_hours: BusinessHoursConfig,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            thresholds: LevelThresholds::default(),
            factors: FactorPoints::default(),
            failure_window_secs: 3600,
            failure_threshold: 3,
            impossible_speed_kmh: 1000.0,
            minor_travel_km: 100.0,
            unknown_history: UnknownHistory::Lenient,
            business_hours: BusinessHoursConfig::default(),
        }
    }
}

/// Score boundaries between risk levels. Scores below `medium` are low,
/// `medium..high` are medium, and `high` and above are high.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub medium: u32,
    pub high: u32,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            medium: 40,
            high: 75,
        }
    }
}

/// Point contribution of each risk factor when it triggers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorPoints {
    pub new_location: u32,
    pub outside_hours: u32,
    pub repeated_failures: u32,
    pub unknown_device: u32,
    pub impossible_travel: u32,
    pub flagged_network: u32,
}

impl Default for FactorPoints {
    fn default() -> Self {
        Self {
            new_location: 30,
            outside_hours: 15,
            repeated_failures: 25,
            unknown_device: 20,
            impossible_travel: 35,
            flagged_network: 40,
        }
    }
}

/// Posture for signals the subject has no history for.
///
/// `Lenient` treats an absent signal as non-triggering (absence of evidence
/// is not evidence of risk). `FailSafe` triggers the corresponding factor
/// instead, so first-contact subjects score as unknown rather than trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownHistory {
    #[default]
    Lenient,
    FailSafe,
}

/// Business-hours window used to derive the outside-hours signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessHoursConfig {
    /// First hour of the working day (inclusive, 0-23).
    pub start_hour: u32,
    /// Hour the working day ends (exclusive, 1-24).
    pub end_hour: u32,
    /// Whether weekends count as outside hours regardless of the clock.
    #[serde(default = "default_true")]
    pub weekdays_only: bool,
    /// IANA timezone the window is anchored in.
    pub timezone: String,
}

impl Default for BusinessHoursConfig {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 18,
            weekdays_only: true,
            timezone: "UTC".into(),
        }
    }
}

// ── Policy engine ───────────────────────────────────────────────────────────

/// Policy store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Install the built-in default policy set when the store is empty.
    #[serde(default = "default_true")]
    pub seed_defaults: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            seed_defaults: true,
        }
    }
}

// ── Step-up challenges ──────────────────────────────────────────────────────

/// Step-up challenge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepUpConfig {
    /// Challenge lifetime in seconds. Defaults to 15 minutes.
    pub ttl_secs: u64,
    /// Digits in a generated one-time code.
    pub otp_digits: u32,
    /// Minimum accepted PIN length.
    pub min_pin_len: usize,
}

impl Default for StepUpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 900,
            otp_digits: 6,
            min_pin_len: 4,
        }
    }
}

// ── Audit / metrics ─────────────────────────────────────────────────────────

/// Audit pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Whether decisions are mirrored to the structured log.
    #[serde(default = "default_true")]
    pub log_events: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_events: true,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled.
    pub enabled: bool,
    /// Global labels added to all metrics.
    pub labels: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

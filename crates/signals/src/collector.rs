//! Assembles a [`RiskContext`] from request signals and the subject's record.
//!
//! Pure data assembly: the collector derives booleans and counts but makes no
//! access decision. A history lookup failure aborts the evaluation; lesser
//! gaps (no user agent, unresolved location) degrade the context and are
//! noted for the audit trail.

use std::sync::Arc;

use {
    chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday},
    chrono_tz::Tz,
    serde::{Deserialize, Serialize},
    tracing::warn,
};

use castellan_config::{RiskConfig, UnknownHistory};

use crate::{
    Error, Result,
    context::{ResolvedLocation, RiskContext},
    fingerprint,
    history::SubjectHistory,
    intel::NetworkIntel,
};

/// Raw inputs for one authentication attempt, as supplied by the auth flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSignals {
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub source_ip: Option<std::net::IpAddr>,
    pub user_agent: Option<String>,
    /// Caller-computed fingerprint. When absent it is derived from the
    /// user agent.
    pub device_fingerprint: Option<String>,
    pub location: Option<ResolvedLocation>,
}

impl AttemptSignals {
    /// Minimal signals for `subject_id` at `timestamp`; everything else unset.
    #[must_use]
    pub fn new(subject_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            subject_id: subject_id.into(),
            timestamp,
            source_ip: None,
            user_agent: None,
            device_fingerprint: None,
            location: None,
        }
    }
}

/// Builds the per-attempt [`RiskContext`].
pub struct SignalCollector {
    history: Arc<dyn SubjectHistory>,
    intel: Arc<dyn NetworkIntel>,
    config: RiskConfig,
    timezone: Tz,
}

impl SignalCollector {
    /// Fails if the configured business-hours timezone is not a known IANA
    /// name.
    pub fn new(
        config: RiskConfig,
        history: Arc<dyn SubjectHistory>,
        intel: Arc<dyn NetworkIntel>,
    ) -> Result<Self> {
        let timezone = config
            .business_hours
            .timezone
            .parse::<Tz>()
            .map_err(|_| Error::unknown_timezone(&config.business_hours.timezone))?;
        Ok(Self {
            history,
            intel,
            config,
            timezone,
        })
    }

    /// Assemble the context for one attempt.
    ///
    /// Errors only when the history collaborator fails; scoring must never
    /// run against a guessed history.
    pub async fn collect(&self, signals: AttemptSignals) -> Result<RiskContext> {
        let mut degradations = Vec::new();

        let device_fingerprint = match (signals.device_fingerprint, signals.user_agent.as_deref()) {
            (Some(fp), _) => Some(fp),
            (None, Some(ua)) => Some(fingerprint::derive(ua)),
            (None, None) => {
                degradations
                    .push("device fingerprint unavailable: no user agent supplied".to_string());
                None
            },
        };

        let failures_since =
            signals.timestamp - Duration::seconds(self.config.failure_window_secs as i64);
        let history = self
            .history
            .snapshot(&signals.subject_id, failures_since)
            .await?;

        let fail_safe = self.config.unknown_history == UnknownHistory::FailSafe;

        let known_device = match &device_fingerprint {
            None => true,
            Some(_) if history.known_devices.is_empty() => !fail_safe,
            Some(fp) => history.known_devices.iter().any(|d| d == fp),
        };

        let country = signals.location.as_ref().and_then(|l| l.country.as_deref());
        let known_location = match country {
            None => {
                degradations.push("source location unresolved: location signal skipped".to_string());
                true
            },
            Some(_) if history.known_countries.is_empty() => !fail_safe,
            Some(c) => history
                .known_countries
                .iter()
                .any(|k| k.eq_ignore_ascii_case(c)),
        };

        let mut network_flag = signals
            .user_agent
            .as_deref()
            .and_then(fingerprint::suspect_agent)
            .map(|tool| format!("scanning tool in user agent: {tool}"));

        if network_flag.is_none() {
            match signals.source_ip {
                Some(ip) => match self.intel.check(ip).await {
                    Ok(flag) => network_flag = flag,
                    Err(e) => {
                        warn!(error = %e, "network intel lookup failed, treating origin as unflagged");
                        degradations.push(format!("network intel lookup failed: {e}"));
                    },
                },
                None => {
                    degradations.push("source ip missing: network origin unchecked".to_string());
                },
            }
        }

        Ok(RiskContext {
            subject_id: signals.subject_id,
            timestamp: signals.timestamp,
            source_ip: signals.source_ip,
            resolved_location: signals.location,
            device_fingerprint,
            is_business_hours: self.is_business_hours(signals.timestamp),
            recent_failed_attempts: history.failed_attempts,
            known_device,
            known_location,
            known_device_count: history.known_devices.len(),
            known_location_count: history.known_countries.len(),
            previous_location_and_time: history.last_fix,
            network_flag,
            degradations,
        })
    }

    /// Whether `at` falls inside the configured business-hours window,
    /// evaluated in the configured timezone.
    #[must_use]
    pub fn is_business_hours(&self, at: DateTime<Utc>) -> bool {
        let hours = &self.config.business_hours;
        let local = at.with_timezone(&self.timezone);
        if hours.weekdays_only && matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let hour = local.hour();
        hour >= u32::from(hours.start_hour) && hour < u32::from(hours.end_hour)
    }
}

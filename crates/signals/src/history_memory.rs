//! In-memory history store for tests and single-process deployments.

use std::{collections::HashMap, sync::Mutex};

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
};

use crate::{
    Result,
    context::LocationFix,
    history::{AttemptRecord, HistorySnapshot, SubjectHistory},
};

/// History backed by `HashMap`. No persistence.
pub struct InMemoryHistory {
    attempts: Mutex<HashMap<String, Vec<AttemptRecord>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Append one attempt to the subject's record.
    pub fn record_attempt(&self, record: AttemptRecord) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        attempts
            .entry(record.subject_id.clone())
            .or_default()
            .push(record);
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubjectHistory for InMemoryHistory {
    async fn snapshot(
        &self,
        subject_id: &str,
        failures_since: DateTime<Utc>,
    ) -> Result<HistorySnapshot> {
        let attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let records = match attempts.get(subject_id) {
            Some(r) => r,
            None => return Ok(HistorySnapshot::default()),
        };

        let mut known_devices: Vec<String> = Vec::new();
        let mut known_countries: Vec<String> = Vec::new();
        let mut last_fix: Option<LocationFix> = None;
        let mut failed_attempts = 0u32;

        for record in records {
            if !record.succeeded {
                if record.observed_at >= failures_since {
                    failed_attempts += 1;
                }
                continue;
            }
            if let Some(fp) = &record.device_fingerprint
                && !known_devices.contains(fp)
            {
                known_devices.push(fp.clone());
            }
            if let Some(country) = &record.country
                && !known_countries.iter().any(|k| k.eq_ignore_ascii_case(country))
            {
                known_countries.push(country.clone());
            }
            if let (Some(lat), Some(lon)) = (record.latitude, record.longitude)
                && last_fix.is_none_or(|fix| record.observed_at > fix.observed_at)
            {
                last_fix = Some(LocationFix {
                    latitude: lat,
                    longitude: lon,
                    observed_at: record.observed_at,
                });
            }
        }

        Ok(HistorySnapshot {
            known_devices,
            known_countries,
            last_fix,
            failed_attempts,
        })
    }
}

//! Read interface for a subject's historical authentication record.

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

use crate::{Result, context::LocationFix};

/// What the history collaborator knows about a subject.
///
/// Devices and countries come from successful attempts only; a failed attempt
/// never enrolls anything. `failed_attempts` counts failures after the cutoff
/// the caller supplied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub known_devices: Vec<String>,
    pub known_countries: Vec<String>,
    pub last_fix: Option<LocationFix>,
    pub failed_attempts: u32,
}

impl HistorySnapshot {
    /// True when the subject has no record at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known_devices.is_empty() && self.known_countries.is_empty() && self.last_fix.is_none()
    }
}

/// One recorded authentication attempt, the write-side unit for the
/// provided store implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub subject_id: String,
    pub succeeded: bool,
    pub device_fingerprint: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

/// Historical-data collaborator. Read-only from the evaluation pipeline's
/// perspective; recording attempts is the auth flow's concern.
#[async_trait]
pub trait SubjectHistory: Send + Sync {
    /// Snapshot of `subject_id`'s record. Failures are counted from
    /// `failures_since` onward.
    async fn snapshot(
        &self,
        subject_id: &str,
        failures_since: DateTime<Utc>,
    ) -> Result<HistorySnapshot>;
}

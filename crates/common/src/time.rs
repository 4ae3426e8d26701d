//! Epoch-millisecond helpers shared by the evaluation pipeline and stores.

use chrono::{DateTime, TimeZone, Utc};

/// Current wall-clock time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert an epoch-millisecond stamp back to a UTC datetime.
///
/// Out-of-range stamps clamp to the epoch rather than panicking.
#[must_use]
pub fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    match Utc.timestamp_millis_opt(ms) {
        chrono::LocalResult::Single(dt) => dt,
        _ => DateTime::<Utc>::UNIX_EPOCH,
    }
}

/// Milliseconds since the Unix epoch for a UTC datetime.
#[must_use]
pub fn datetime_to_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

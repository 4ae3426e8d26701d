//! Great-circle distance and implied travel speed between location fixes.

use castellan_signals::LocationFix;
use chrono::{DateTime, Utc};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates, in kilometres.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Travel implied by a previous fix and the current attempt's coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpliedTravel {
    pub distance_km: f64,
    /// Speed needed to cover the distance in the elapsed time, in km/h.
    /// `None` when no time has elapsed, where any distance is unreachable.
    pub speed_kmh: Option<f64>,
}

/// Compute the travel implied between `previous` and the current attempt.
#[must_use]
pub fn implied_travel(
    previous: &LocationFix,
    latitude: f64,
    longitude: f64,
    at: DateTime<Utc>,
) -> ImpliedTravel {
    let distance_km = haversine_km(previous.latitude, previous.longitude, latitude, longitude);
    let elapsed = at - previous.observed_at;
    let hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;
    let speed_kmh = (hours > 0.0).then(|| distance_km / hours);
    ImpliedTravel {
        distance_km,
        speed_kmh,
    }
}

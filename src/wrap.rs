//! Longitude wrapping for a map that scrolls across three world widths.
//!
//! Every record is rendered three times, one world to the west, in place, and
//! one world to the east, so markers near the antimeridian stay continuous
//! while the user pans.

use crate::types::Located;
use serde::Serialize;

/// Shifts applied to each record, west to east.
pub const WORLD_SHIFTS: [i32; 3] = [-360, 0, 360];

/// `[[south, west], [north, east]]` of the three-world map view.
pub const MAP_BOUNDS: [[f64; 2]; 2] = [[-90.0, -540.0], [90.0, 540.0]];

/// Brings a longitude into [-180, 180] by whole-world shifts. Values already in
/// range, including both endpoints, are returned untouched.
pub fn normalize_longitude(lon: f64) -> f64 {
    if !lon.is_finite() {
        return lon;
    }
    if lon > 180.0 {
        lon - 360.0 * ((lon - 180.0) / 360.0).ceil()
    } else if lon < -180.0 {
        lon + 360.0 * ((-180.0 - lon) / 360.0).ceil()
    } else {
        lon
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedPoint<T> {
    pub key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub shift: i32,
    pub record: T,
}

/// Three copies of `record` at normalized longitude -360, +0 and +360.
pub fn wrap<T: Located + Clone>(record: &T) -> [WrappedPoint<T>; 3] {
    let lat = record.latitude();
    let lon = normalize_longitude(record.longitude());

    WORLD_SHIFTS.map(|shift| WrappedPoint {
        key: format!("{}:{}:{}", lat, lon, shift),
        latitude: lat,
        longitude: lon + shift as f64,
        shift,
        record: record.clone(),
    })
}

pub fn wrap_all<T: Located + Clone>(records: &[T]) -> Vec<WrappedPoint<T>> {
    records.iter().flat_map(wrap).collect()
}

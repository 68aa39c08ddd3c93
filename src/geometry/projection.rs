//! GPS to local-frame projection.
//!
//! Offsets from the session's base latitude/longitude are measured with the
//! haversine great-circle distance, once along the meridian (north) and once
//! along the parallel (west).

use nalgebra::Vector3;

use crate::telemetry::record::{Baselines, GpsFix, TelemetryRecord};

/// Earth radius used by the projection, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// Great-circle distance in meters between two latitude/longitude pairs (degrees).
///
/// # Examples
///
/// ```
/// use ground_station::geometry::projection::haversine_m;
///
/// // One degree of latitude is about 111 km on this sphere.
/// let d = haversine_m(59.0, 10.0, 60.0, 10.0);
/// assert!((d - 111_319.5).abs() < 1.0);
/// ```
#[must_use]
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c * 1000.0
}

/// Project a fix onto the local frame
///
/// # Returns
///
/// * `Some(Vector3)` - `(west, 0, north)` offsets in meters from the base position
/// * `None` - Base latitude or longitude not frozen yet
#[must_use]
pub fn gps_to_local(fix: &GpsFix, baselines: &Baselines) -> Option<Vector3<f64>> {
    let base_lat = baselines.latitude?;
    let base_lon = baselines.longitude?;

    let north = haversine_m(fix.latitude, base_lon, base_lat, base_lon)
        .copysign(fix.latitude - base_lat);
    let east = haversine_m(base_lat, fix.longitude, base_lat, base_lon)
        .copysign(fix.longitude - base_lon);

    Some(Vector3::new(-east, 0.0, north))
}

/// GPS position of a record with the barometric altitude above base in Y.
///
/// The result is not bounds-checked.
#[must_use]
pub fn gps_position(record: &TelemetryRecord, baselines: &Baselines) -> Option<Vector3<f64>> {
    let mut position = gps_to_local(&record.gps, baselines)?;
    position.y = record.altitude_above_base(baselines);
    Some(position)
}

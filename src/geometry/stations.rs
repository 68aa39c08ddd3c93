//! # Ground Station Layout
//!
//! Operator-supplied inputs for RSSI positioning: three station positions and
//! a per-station one-meter RSSI reference. Both can be edited while a session
//! is running.
//!
//! World positions use the local frame (X west, Y up, Z north). Station 0 is
//! the plane origin and station 1 defines the east axis, so only its X
//! coordinate is used.

use nalgebra::{Vector2, Vector3};
use tracing::debug;

use super::bounds::PointBounds;
use super::rssi::{rssi_to_distance, DEFAULT_ONE_METER_RSSI, DEFAULT_TX_POWER_DBM};
use super::trilateration::trilaterate;
use crate::config::StationConfig;
use crate::telemetry::record::{Baselines, TelemetryRecord};

/// Number of ground stations.
pub const STATION_COUNT: usize = 3;

/// Station positions and calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct StationLayout {
    positions: [Vector3<f64>; STATION_COUNT],
    one_meter_rssi: [f64; STATION_COUNT],
    tx_power: f64,
}

impl Default for StationLayout {
    fn default() -> Self {
        Self {
            positions: [
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(-1000.0, 0.0, 0.0),
                Vector3::new(-500.0, 0.0, 500.0),
            ],
            one_meter_rssi: [DEFAULT_ONE_METER_RSSI; STATION_COUNT],
            tx_power: DEFAULT_TX_POWER_DBM,
        }
    }
}

impl From<&StationConfig> for StationLayout {
    fn from(config: &StationConfig) -> Self {
        Self {
            positions: config.positions.map(|[x, y, z]| Vector3::new(x, y, z)),
            one_meter_rssi: config.one_meter_rssi,
            tx_power: config.tx_power_dbm,
        }
    }
}

impl StationLayout {
    #[must_use]
    pub fn new(positions: [Vector3<f64>; STATION_COUNT], one_meter_rssi: [f64; STATION_COUNT], tx_power: f64) -> Self {
        Self {
            positions,
            one_meter_rssi,
            tx_power,
        }
    }

    #[must_use]
    pub fn positions(&self) -> &[Vector3<f64>; STATION_COUNT] {
        &self.positions
    }

    #[must_use]
    pub fn one_meter_rssi(&self) -> &[f64; STATION_COUNT] {
        &self.one_meter_rssi
    }

    /// Move a station. Out-of-range indices are ignored.
    pub fn set_position(&mut self, station: usize, position: Vector3<f64>) {
        if let Some(slot) = self.positions.get_mut(station) {
            debug!("Station {} moved to {:?}", station, position);
            *slot = position;
        }
    }

    /// Recalibrate a station's one-meter reference. Out-of-range indices are ignored.
    pub fn set_one_meter_rssi(&mut self, station: usize, rssi: f64) {
        if let Some(slot) = self.one_meter_rssi.get_mut(station) {
            *slot = rssi;
        }
    }

    /// Station positions mapped to `(east, north)` plane coordinates relative
    /// to station 0.
    #[must_use]
    pub fn plane(&self) -> [Vector2<f64>; STATION_COUNT] {
        let origin = self.positions[0];
        let s1 = self.positions[1] - origin;
        let s2 = self.positions[2] - origin;

        [
            Vector2::zeros(),
            Vector2::new(-s1.x, 0.0),
            Vector2::new(-s2.x, s2.z),
        ]
    }

    /// Distances to the three stations from a record's S1..S3 readings.
    #[must_use]
    pub fn distances(&self, record: &TelemetryRecord) -> [f64; STATION_COUNT] {
        let readings = record.rssi.stations();
        let mut distances = [0.0; STATION_COUNT];
        for (i, distance) in distances.iter_mut().enumerate() {
            *distance = rssi_to_distance(f64::from(readings[i]), self.tx_power, self.one_meter_rssi[i]);
        }
        distances
    }

    /// RSSI position of a record in the world frame
    ///
    /// Horizontal position comes from trilateration, Y is the barometric
    /// altitude above base.
    ///
    /// # Returns
    ///
    /// * `None` - Degenerate station layout or the point fails `bounds`
    #[must_use]
    pub fn solve(&self, record: &TelemetryRecord, baselines: &Baselines, bounds: &PointBounds) -> Option<Vector3<f64>> {
        let solution = trilaterate(self.plane(), self.distances(record))?;
        let origin = self.positions[0];

        let position = Vector3::new(
            origin.x - solution.x,
            record.altitude_above_base(baselines),
            origin.z + solution.y,
        );
        bounds.filter(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_rssi(s: [i32; 4], altitude: f64) -> TelemetryRecord {
        let mut record = TelemetryRecord::new(1, 0);
        record.rssi = crate::telemetry::record::RssiReading::from_values(s);
        record.altitude = altitude;
        record
    }

    #[test]
    fn test_default_plane() {
        let plane = StationLayout::default().plane();
        assert_eq!(plane[1], Vector2::new(1000.0, 0.0));
        assert_eq!(plane[2], Vector2::new(500.0, 500.0));
    }

    #[test]
    fn test_setters() {
        let mut layout = StationLayout::default();
        layout.set_position(2, Vector3::new(-400.0, 0.0, 300.0));
        layout.set_one_meter_rssi(1, -45.0);
        layout.set_position(7, Vector3::zeros());

        assert_eq!(layout.positions()[2], Vector3::new(-400.0, 0.0, 300.0));
        assert_eq!(layout.one_meter_rssi(), &[-60.0, -45.0, -60.0]);
    }

    #[test]
    fn test_distances_use_station_readings() {
        let layout = StationLayout::default();
        let record = record_with_rssi([0, -60, -80, -100], 0.0);
        let d = layout.distances(&record);
        assert!((d[0] - 1.0).abs() < 1e-9);
        assert!((d[1] - 10.0).abs() < 1e-9);
        assert!((d[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_solve_places_point_in_world_frame() {
        // Stations at origin, 100 m east and 100 m north (X points west).
        let layout = StationLayout::new(
            [Vector3::zeros(), Vector3::new(-100.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 100.0)],
            [-60.0; 3],
            17.0,
        );
        // Equal ranges put the point at (50 east, 50 north).
        let r = 50.0_f64.hypot(50.0);
        let rssi = (-60.0 - 20.0 * r.log10()).round() as i32;
        let record = record_with_rssi([0, rssi, rssi, rssi], 130.0);
        let baselines = Baselines {
            altitude: Some(100.0),
            ..Baselines::default()
        };

        let p = layout.solve(&record, &baselines, &PointBounds::default()).unwrap();
        assert!((p.x + 50.0).abs() < 1.0, "x = {}", p.x);
        assert!((p.z - 50.0).abs() < 1.0, "z = {}", p.z);
        assert_eq!(p.y, 30.0);
    }

    #[test]
    fn test_solve_rejects_out_of_bounds() {
        let layout = StationLayout::default();
        // Sentinel readings map to absurd distances.
        let record = record_with_rssi([-9999; 4], 0.0);
        assert!(layout.solve(&record, &Baselines::default(), &PointBounds::default()).is_none());
    }

    #[test]
    fn test_from_config() {
        let config = StationConfig {
            positions: [[0.0, 0.0, 0.0], [-200.0, 0.0, 0.0], [-100.0, 0.0, 150.0]],
            one_meter_rssi: [-55.0, -58.0, -61.0],
            tx_power_dbm: 20.0,
        };
        let layout = StationLayout::from(&config);
        assert_eq!(layout.positions()[2], Vector3::new(-100.0, 0.0, 150.0));
        assert_eq!(layout.one_meter_rssi(), &[-55.0, -58.0, -61.0]);
    }
}

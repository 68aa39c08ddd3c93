//! Time-based interpolation of GPS positions.
//!
//! GPS fixes arrive less often than barometric and RSSI samples. A
//! [`GpsTrack`] keeps the valid projected fixes and linearly interpolates
//! between the two that bracket a query time. It never extrapolates.

use nalgebra::Vector3;

use super::bounds::PointBounds;
use super::projection::gps_position;
use crate::telemetry::record::{Baselines, TelemetryRecord};

/// Barometric altitude (above base) usable as the vertical coordinate.
#[must_use]
pub fn valid_altitude(altitude: f64) -> Option<f64> {
    let invalid = altitude.is_nan() || altitude <= -1.0 || altitude >= 10_000.0 || altitude == 0.0;
    (!invalid).then_some(altitude)
}

/// Validated `(milliseconds, position)` samples in log order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpsTrack {
    samples: Vec<(i64, Vector3<f64>)>,
}

impl GpsTrack {
    /// Build a track from explicit samples. Invalid points are dropped.
    #[must_use]
    pub fn from_samples<I>(samples: I, bounds: &PointBounds) -> Self
    where
        I: IntoIterator<Item = (i64, Vector3<f64>)>,
    {
        Self {
            samples: samples
                .into_iter()
                .filter(|(_, p)| bounds.contains(p))
                .collect(),
        }
    }

    /// Project every record's fix and keep the valid ones.
    #[must_use]
    pub fn from_records(records: &[TelemetryRecord], baselines: &Baselines, bounds: &PointBounds) -> Self {
        Self::from_samples(
            records
                .iter()
                .filter_map(|r| gps_position(r, baselines).map(|p| (r.milliseconds, p))),
            bounds,
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn samples(&self) -> &[(i64, Vector3<f64>)] {
        &self.samples
    }

    /// Interpolated position at `ms`
    ///
    /// Scans for the first consecutive pair with `t0 <= ms <= t1` and blends
    /// linearly by the time fraction.
    ///
    /// # Returns
    ///
    /// * `None` - Fewer than two samples, or `ms` outside the track
    ///
    /// # Examples
    ///
    /// ```
    /// use ground_station::geometry::bounds::PointBounds;
    /// use ground_station::geometry::interpolation::GpsTrack;
    /// use nalgebra::Vector3;
    ///
    /// let track = GpsTrack::from_samples(
    ///     [(0, Vector3::new(0.0, 0.0, 0.0)), (1000, Vector3::new(10.0, 0.0, 20.0))],
    ///     &PointBounds::default(),
    /// );
    /// assert_eq!(track.estimate(250), Some(Vector3::new(2.5, 0.0, 5.0)));
    /// assert_eq!(track.estimate(1001), None);
    /// ```
    #[must_use]
    pub fn estimate(&self, ms: i64) -> Option<Vector3<f64>> {
        self.samples.windows(2).find_map(|pair| {
            let (t0, p0) = pair[0];
            let (t1, p1) = pair[1];

            if ms < t0 || ms > t1 {
                return None;
            }
            if t1 == t0 {
                return Some(p0);
            }

            let fraction = (ms - t0) as f64 / (t1 - t0) as f64;
            Some(p0 + (p1 - p0) * fraction)
        })
    }

    /// Estimated position for a record: interpolated horizontal position with
    /// the record's own barometric altitude in Y.
    #[must_use]
    pub fn estimate_for(&self, record: &TelemetryRecord, baselines: &Baselines) -> Option<Vector3<f64>> {
        let altitude = valid_altitude(record.altitude_above_base(baselines))?;
        let mut position = self.estimate(record.milliseconds)?;
        position.y = altitude;
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::record::GpsFix;

    fn track() -> GpsTrack {
        GpsTrack::from_samples(
            [
                (1000, Vector3::new(0.0, 10.0, 0.0)),
                (2000, Vector3::new(100.0, 20.0, -50.0)),
                (4000, Vector3::new(100.0, 40.0, 50.0)),
            ],
            &PointBounds::default(),
        )
    }

    #[test]
    fn test_interpolates_between_bracketing_fixes() {
        let t = track();
        assert_eq!(t.estimate(1500), Some(Vector3::new(50.0, 15.0, -25.0)));
        assert_eq!(t.estimate(3000), Some(Vector3::new(100.0, 30.0, 0.0)));
    }

    #[test]
    fn test_exact_sample_times() {
        let t = track();
        assert_eq!(t.estimate(1000), Some(Vector3::new(0.0, 10.0, 0.0)));
        assert_eq!(t.estimate(4000), Some(Vector3::new(100.0, 40.0, 50.0)));
    }

    #[test]
    fn test_no_extrapolation() {
        let t = track();
        assert_eq!(t.estimate(999), None);
        assert_eq!(t.estimate(4001), None);
    }

    #[test]
    fn test_too_few_fixes() {
        let single = GpsTrack::from_samples([(0, Vector3::zeros())], &PointBounds::default());
        assert_eq!(single.estimate(0), None);
        assert_eq!(GpsTrack::default().estimate(0), None);
    }

    #[test]
    fn test_invalid_samples_are_dropped() {
        let t = GpsTrack::from_samples(
            [
                (0, Vector3::new(0.0, 0.0, 0.0)),
                (500, Vector3::new(f64::NAN, 0.0, 0.0)),
                (1000, Vector3::new(9000.0, 0.0, 0.0)),
                (2000, Vector3::new(20.0, 0.0, 0.0)),
            ],
            &PointBounds::default(),
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t.estimate(1000), Some(Vector3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_duplicate_timestamps() {
        let t = GpsTrack::from_samples(
            [(100, Vector3::new(1.0, 0.0, 0.0)), (100, Vector3::new(2.0, 0.0, 0.0))],
            &PointBounds::default(),
        );
        assert_eq!(t.estimate(100), Some(Vector3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_from_records_and_estimate_for() {
        let baselines = Baselines {
            latitude: Some(59.9),
            longitude: Some(10.7),
            altitude: Some(100.0),
            ..Baselines::default()
        };

        let mut records = Vec::new();
        for (i, lat) in [(0, 59.9), (2, 59.901)] {
            let mut r = TelemetryRecord::new(i, i * 1000);
            r.gps = GpsFix { latitude: lat, longitude: 10.7, ..GpsFix::default() };
            r.altitude = 150.0;
            records.push(r);
        }
        let track = GpsTrack::from_records(&records, &baselines, &PointBounds::default());
        assert_eq!(track.len(), 2);

        let mut query = TelemetryRecord::new(1, 1000);
        query.altitude = 180.0;
        let p = track.estimate_for(&query, &baselines).unwrap();
        assert!((p.z - 55.66).abs() < 0.1, "north = {}", p.z);
        assert_eq!(p.y, 80.0);

        query.altitude = 100.0;
        assert!(track.estimate_for(&query, &baselines).is_none(), "Zero altitude is a gap");
    }

    #[test]
    fn test_valid_altitude() {
        assert_eq!(valid_altitude(12.0), Some(12.0));
        assert_eq!(valid_altitude(0.0), None);
        assert_eq!(valid_altitude(-1.0), None);
        assert_eq!(valid_altitude(10_000.0), None);
        assert_eq!(valid_altitude(f64::NAN), None);
    }
}

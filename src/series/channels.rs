//! # Standard Channels
//!
//! Ready-made series for the dashboard's sensor channels, with the
//! calibration and plausibility limits of the flight hardware.

use std::collections::BTreeSet;

use nalgebra::Vector3;

use super::{Series, SeriesPoint};
use crate::geometry::bounds::PointBounds;
use crate::geometry::interpolation::{valid_altitude, GpsTrack};
use crate::geometry::projection::gps_position;
use crate::geometry::stations::StationLayout;
use crate::telemetry::record::{Baselines, TelemetryRecord};
use crate::telemetry::session::SessionSnapshot;

/// Full-scale reading of the panel ADC.
pub const PANEL_ADC_MAX: i32 = 1023;

/// ADC reference voltage.
pub const PANEL_REFERENCE_VOLTS: f64 = 5.0;

/// Indices above this are treated as corrupt when looking for gaps.
pub const MAX_PLAUSIBLE_INDEX: i64 = 99_999;

fn nan_point() -> Vector3<f64> {
    Vector3::repeat(f64::NAN)
}

/// Analog temperature sensor calibration (raw ADC to °C).
#[must_use]
pub fn analog_temperature_celsius(raw: f64) -> f64 {
    -0.05 * raw + 63.62
}

/// Panel voltage from a raw ADC value; saturated or unset readings have none.
///
/// # Examples
///
/// ```
/// use ground_station::series::channels::panel_voltage;
///
/// assert!((panel_voltage(1022).unwrap() - 4.995).abs() < 1e-3);
/// assert_eq!(panel_voltage(1023), None);
/// assert_eq!(panel_voltage(-9999), None);
/// ```
#[must_use]
pub fn panel_voltage(raw: i32) -> Option<f64> {
    (0..PANEL_ADC_MAX)
        .contains(&raw)
        .then(|| f64::from(raw) * PANEL_REFERENCE_VOLTS / f64::from(PANEL_ADC_MAX))
}

fn outside_temperature_range(v: f64) -> bool {
    v >= 40.0 || v <= -30.0
}

/// Analog sensor temperature (°C).
#[must_use]
pub fn analog_temperature() -> Series<f64> {
    Series::new("Analog", |r: &TelemetryRecord, _: &Baselines| {
        analog_temperature_celsius(r.analog_temperature)
    })
    .with_invalid(|v: &f64| outside_temperature_range(*v))
}

/// Digital (BMP) sensor temperature (°C). The sensor reports -1 when absent.
#[must_use]
pub fn bmp_temperature() -> Series<f64> {
    Series::new("BMP", |r: &TelemetryRecord, _: &Baselines| r.temperature)
        .with_invalid(|v: &f64| outside_temperature_range(*v) || *v == -1.0)
}

/// Barometric altitude above the session's base altitude (m).
#[must_use]
pub fn barometric_altitude() -> Series<f64> {
    Series::new("BMP", |r: &TelemetryRecord, b: &Baselines| r.altitude_above_base(b))
        .with_invalid(|v: &f64| valid_altitude(*v).is_none())
}

/// GPS altitude (m).
#[must_use]
pub fn gps_altitude() -> Series<f64> {
    Series::new("GPS", |r: &TelemetryRecord, _: &Baselines| r.gps.altitude)
        .with_invalid(|v: &f64| v.is_nan() || *v <= -0.899 || *v >= 10_000.0)
}

/// Pressure (hPa).
#[must_use]
pub fn pressure() -> Series<f64> {
    Series::new("BMP", |r: &TelemetryRecord, _: &Baselines| r.pressure)
        .with_invalid(|v: &f64| v.is_nan() || *v < 300.0 || *v > 1100.0)
}

/// Voltage of one solar panel (V). `panel` is 0-3.
#[must_use]
pub fn panel(panel: usize) -> Series<f64> {
    Series::new(format!("Panel {}", panel + 1), move |r: &TelemetryRecord, _: &Baselines| {
        r.panels
            .get(panel)
            .and_then(panel_voltage)
            .unwrap_or(f64::NAN)
    })
    .with_invalid(|v: &f64| v.is_nan())
}

/// Trilaterated RSSI position for a fixed station layout.
///
/// Rebuild the series after editing the layout.
#[must_use]
pub fn rssi_position(layout: StationLayout, bounds: PointBounds) -> Series<Vector3<f64>> {
    Series::new("Triangulation", move |r: &TelemetryRecord, b: &Baselines| {
        layout.solve(r, b, &bounds).unwrap_or_else(nan_point)
    })
    .with_invalid(move |p: &Vector3<f64>| !bounds.contains(p))
}

/// Projected GPS position.
#[must_use]
pub fn gps_local_position(bounds: PointBounds) -> Series<Vector3<f64>> {
    Series::new("GPS", |r: &TelemetryRecord, b: &Baselines| {
        gps_position(r, b).unwrap_or_else(nan_point)
    })
    .with_invalid(move |p: &Vector3<f64>| !bounds.contains(p))
}

/// GPS position interpolated at every record's timestamp.
///
/// Needs the whole log, so it is computed per snapshot rather than per record.
#[must_use]
pub fn estimated_positions(snapshot: &SessionSnapshot, bounds: &PointBounds) -> Vec<SeriesPoint<Vector3<f64>>> {
    let track = GpsTrack::from_records(&snapshot.records, &snapshot.baselines, bounds);

    snapshot
        .records
        .iter()
        .map(|r| SeriesPoint {
            index: r.seconds(),
            value: track
                .estimate_for(r, &snapshot.baselines)
                .filter(|p| bounds.contains(p)),
        })
        .collect()
}

/// Vertical speed (m/s) from consecutive valid barometric altitudes.
///
/// A sample with an invalid altitude is a gap and does not become the new
/// reference; the first valid sample has no predecessor and is a gap too.
#[must_use]
pub fn vertical_speed(records: &[TelemetryRecord]) -> Vec<SeriesPoint<f64>> {
    let mut last: Option<(f64, f64)> = None;

    records
        .iter()
        .map(|r| {
            let t = r.seconds();
            let value = valid_altitude(r.altitude).and_then(|altitude| {
                let speed = last.map(|(prev_alt, prev_t)| (altitude - prev_alt) / (t - prev_t));
                last = Some((altitude, t));
                speed.filter(|s| s.is_finite())
            });

            SeriesPoint { index: t, value }
        })
        .collect()
}

/// Sender indices missing between the lowest and highest plausible index.
///
/// # Examples
///
/// ```
/// use ground_station::series::channels::missing_indices;
/// use ground_station::telemetry::record::TelemetryRecord;
///
/// let records: Vec<_> = [3, 4, 7, 9].iter().map(|&i| TelemetryRecord::new(i, 0)).collect();
/// assert_eq!(missing_indices(&records), vec![5, 6, 8]);
/// ```
#[must_use]
pub fn missing_indices(records: &[TelemetryRecord]) -> Vec<i64> {
    let seen: BTreeSet<i64> = records
        .iter()
        .map(|r| r.index)
        .filter(|i| (1..=MAX_PLAUSIBLE_INDEX).contains(i))
        .collect();

    match (seen.first(), seen.last()) {
        (Some(&low), Some(&high)) => (low..=high).filter(|i| !seen.contains(i)).collect(),
        _ => Vec::new(),
    }
}

//! # Telemetry Record Types
//!
//! Core data model for one telemetry frame and the session baselines.

use std::fmt;

/// Marker value for a numeric field that never received a line.
pub const SENTINEL: i32 = -9999;

/// Sentinel as a float, for the scalar sensor fields.
pub const SENTINEL_F64: f64 = SENTINEL as f64;

/// GPS year field is transmitted as an offset from this year.
pub const GPS_EPOCH_YEAR: i32 = 1970;

/// Latitude, longitude and altitude are transmitted multiplied by this factor.
pub const GPS_COORDINATE_SCALE: f64 = 10_000.0;

/// Received signal strength, one slot per ground station plus the device's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RssiReading {
    /// Self reading
    pub s0: i32,
    /// Station 1
    pub s1: i32,
    /// Station 2
    pub s2: i32,
    /// Station 3
    pub s3: i32,
}

impl Default for RssiReading {
    fn default() -> Self {
        Self::from_values([SENTINEL; 4])
    }
}

impl RssiReading {
    #[must_use]
    pub fn from_values(values: [i32; 4]) -> Self {
        Self {
            s0: values[0],
            s1: values[1],
            s2: values[2],
            s3: values[3],
        }
    }

    /// Readings of the three ground stations (S1, S2, S3).
    #[must_use]
    pub fn stations(&self) -> [i32; 3] {
        [self.s1, self.s2, self.s3]
    }
}

/// Raw ADC values of the four solar panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelReading {
    pub p0: i32,
    pub p1: i32,
    pub p2: i32,
    pub p3: i32,
}

impl Default for PanelReading {
    fn default() -> Self {
        Self::from_values([SENTINEL; 4])
    }
}

impl PanelReading {
    #[must_use]
    pub fn from_values(values: [i32; 4]) -> Self {
        Self {
            p0: values[0],
            p1: values[1],
            p2: values[2],
            p3: values[3],
        }
    }

    /// Panel value by position (0-3).
    ///
    /// # Examples
    ///
    /// ```
    /// use ground_station::telemetry::record::PanelReading;
    ///
    /// let panels = PanelReading::from_values([365, 355, 356, 386]);
    /// assert_eq!(panels.get(3), Some(386));
    /// assert_eq!(panels.get(4), None);
    /// ```
    #[must_use]
    pub fn get(&self, index: usize) -> Option<i32> {
        match index {
            0 => Some(self.p0),
            1 => Some(self.p1),
            2 => Some(self.p2),
            3 => Some(self.p3),
            _ => None,
        }
    }
}

/// Decoded GPS fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub day: i32,
    pub month: i32,
    /// Calendar year (offset already applied)
    pub year: i32,

    pub hour: i32,
    pub minute: i32,
    pub second: i32,

    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in meters
    pub altitude: f64,
}

impl Default for GpsFix {
    fn default() -> Self {
        Self {
            day: 0,
            month: 0,
            year: GPS_EPOCH_YEAR,
            hour: 0,
            minute: 0,
            second: 0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
        }
    }
}

impl GpsFix {
    /// Build a fix from the nine wire values
    ///
    /// # Arguments
    ///
    /// * `values` - day, month, year offset, hour, minute, second,
    ///   latitude×10⁴, longitude×10⁴, altitude×10⁴
    #[must_use]
    pub fn from_raw(values: [f64; 9]) -> Self {
        Self {
            day: values[0] as i32,
            month: values[1] as i32,
            year: values[2] as i32 + GPS_EPOCH_YEAR,
            hour: values[3] as i32,
            minute: values[4] as i32,
            second: values[5] as i32,
            latitude: values[6] / GPS_COORDINATE_SCALE,
            longitude: values[7] / GPS_COORDINATE_SCALE,
            altitude: values[8] / GPS_COORDINATE_SCALE,
        }
    }
}

/// One telemetry frame: the index marker plus every field line up to the next marker.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// Sender-assigned frame index
    pub index: i64,
    /// Session-relative timestamp (first seen timestamp subtracted)
    pub milliseconds: i64,

    /// Digital sensor temperature (°C)
    pub temperature: f64,
    /// Analog temperature, raw ADC
    pub analog_temperature: f64,
    /// Pressure (hPa)
    pub pressure: f64,
    /// Barometric altitude (m)
    pub altitude: f64,
    pub ping: i32,
    pub open: bool,
    pub has_barometer: bool,

    pub rssi: RssiReading,
    pub panels: PanelReading,
    pub gps: GpsFix,

    /// Set by an overflow line; a flagged record is never committed.
    pub marked_for_deletion: bool,
}

impl Default for TelemetryRecord {
    fn default() -> Self {
        Self {
            index: i64::from(SENTINEL),
            milliseconds: i64::from(SENTINEL),
            temperature: SENTINEL_F64,
            analog_temperature: SENTINEL_F64,
            pressure: SENTINEL_F64,
            altitude: SENTINEL_F64,
            ping: SENTINEL,
            open: false,
            has_barometer: false,
            rssi: RssiReading::default(),
            panels: PanelReading::default(),
            gps: GpsFix::default(),
            marked_for_deletion: false,
        }
    }
}

impl TelemetryRecord {
    /// Start a record for an index marker.
    #[must_use]
    pub fn new(index: i64, milliseconds: i64) -> Self {
        Self {
            index,
            milliseconds,
            ..Self::default()
        }
    }

    /// Session-relative time in seconds.
    #[must_use]
    pub fn seconds(&self) -> f64 {
        self.milliseconds as f64 / 1000.0
    }

    /// Barometric altitude relative to the session's base altitude.
    ///
    /// Before a base altitude is frozen the raw altitude is returned.
    #[must_use]
    pub fn altitude_above_base(&self, baselines: &Baselines) -> f64 {
        self.altitude - baselines.altitude.unwrap_or(0.0)
    }
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gps = &self.gps;
        writeln!(f, "Tick: {}", self.index)?;
        writeln!(f, "Seconds: {}", self.seconds())?;
        writeln!(f, "BMP Temperature: {}", self.temperature)?;
        writeln!(f, "Analog Temperature: {}", self.analog_temperature)?;
        writeln!(f, "Pressure: {}", self.pressure)?;
        writeln!(f, "BMP Altitude: {}", self.altitude)?;
        writeln!(f, "Ping: {}", self.ping)?;
        writeln!(f, "Open: {}", self.open)?;
        writeln!(
            f,
            "RSSI: {},{},{},{}",
            self.rssi.s0, self.rssi.s1, self.rssi.s2, self.rssi.s3
        )?;
        writeln!(
            f,
            "Panels: {},{},{},{}",
            self.panels.p0, self.panels.p1, self.panels.p2, self.panels.p3
        )?;
        writeln!(f, "GPS Date: {}/{}/{}", gps.day, gps.month, gps.year)?;
        writeln!(
            f,
            "GPS Time: {:02}:{:02}:{:02}",
            gps.hour, gps.minute, gps.second
        )?;
        writeln!(f, "GPS Position: {}, {}", gps.latitude, gps.longitude)?;
        writeln!(f, "GPS Altitude: {}", gps.altitude)?;
        write!(f, "Has BMP: {}", self.has_barometer)
    }
}

/// Session-scoped values frozen from the first qualifying observation.
///
/// Each field is set at most once per session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Baselines {
    /// Raw timestamp of the first index marker
    pub millis: Option<i64>,
    /// First strictly positive barometric altitude
    pub altitude: Option<f64>,
    /// First strictly positive GPS latitude
    pub latitude: Option<f64>,
    /// First strictly positive GPS longitude
    pub longitude: Option<f64>,
    /// First GPS altitude above -100 m
    pub gps_altitude: Option<f64>,
}

impl Baselines {
    /// Freeze `slot` to `value` if it is still unset and `qualifies` holds.
    ///
    /// Returns true when the slot was set by this call.
    pub(crate) fn freeze<T: Copy>(slot: &mut Option<T>, value: T, qualifies: bool) -> bool {
        if slot.is_none() && qualifies {
            *slot = Some(value);
            true
        } else {
            false
        }
    }
}

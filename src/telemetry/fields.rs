//! # Record Field Parsers
//!
//! Pure functions turning one `key=value` or `key=v0,v1,...` line into a
//! typed field value, plus the `I <index> <millis>` index marker.

use thiserror::Error;

use super::record::{GpsFix, PanelReading, RssiReading};

/// Number of values in an `S=` line
pub const RSSI_FIELD_COUNT: usize = 4;

/// Number of values in a `P=` line
pub const PANEL_FIELD_COUNT: usize = 4;

/// Number of values in a `GPS=` line
pub const GPS_FIELD_COUNT: usize = 9;

/// Line-level decoding failure. Never fatal to a session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{key}: '{value}' is not a number")]
    InvalidNumber { key: String, value: String },

    #[error("{key}: expected {expected} values, found {found}")]
    WrongArity {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("{0}: missing value")]
    MissingValue(String),

    #[error("malformed index marker: '{0}'")]
    MalformedMarker(String),
}

/// Known field keys of the telemetry frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// `T` - digital temperature
    Temperature,
    /// `T2` - analog temperature (raw ADC)
    AnalogTemperature,
    /// `PRS` - pressure
    Pressure,
    /// `ALT` - barometric altitude
    Altitude,
    /// `PING`
    Ping,
    /// `OPN` - open flag
    Open,
    /// `BMP` - barometer present flag
    HasBarometer,
    /// `S` - RSSI quad
    Rssi,
    /// `P` - solar panel quad
    Panel,
    /// `GPS` - nine-value fix
    Gps,
}

impl FieldKey {
    /// Look up a key by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "T" => Some(Self::Temperature),
            "T2" => Some(Self::AnalogTemperature),
            "PRS" => Some(Self::Pressure),
            "ALT" => Some(Self::Altitude),
            "PING" => Some(Self::Ping),
            "OPN" => Some(Self::Open),
            "BMP" => Some(Self::HasBarometer),
            "S" => Some(Self::Rssi),
            "P" => Some(Self::Panel),
            "GPS" => Some(Self::Gps),
            _ => None,
        }
    }

    /// Wire name of the key.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Temperature => "T",
            Self::AnalogTemperature => "T2",
            Self::Pressure => "PRS",
            Self::Altitude => "ALT",
            Self::Ping => "PING",
            Self::Open => "OPN",
            Self::HasBarometer => "BMP",
            Self::Rssi => "S",
            Self::Panel => "P",
            Self::Gps => "GPS",
        }
    }
}

/// A parsed field line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    Temperature(f64),
    AnalogTemperature(f64),
    Pressure(f64),
    Altitude(f64),
    Ping(i32),
    Open(bool),
    HasBarometer(bool),
    Rssi(RssiReading),
    Panel(PanelReading),
    Gps(GpsFix),
}

/// Parsed `I <index> <millis>` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMarker {
    pub index: i64,
    /// Raw device timestamp
    pub millis: i64,
}

impl IndexMarker {
    /// Parse an index marker line
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MalformedMarker` unless the line is `I` followed by
    /// two integers.
    ///
    /// # Examples
    ///
    /// ```
    /// use ground_station::telemetry::fields::IndexMarker;
    ///
    /// let marker = IndexMarker::parse("I 5 3001")?;
    /// assert_eq!(marker.index, 5);
    /// assert_eq!(marker.millis, 3001);
    /// # Ok::<(), ground_station::telemetry::fields::ParseError>(())
    /// ```
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::MalformedMarker(line.to_string());

        let mut parts = line.split_whitespace();
        if parts.next() != Some("I") {
            return Err(malformed());
        }

        let index = parts
            .next()
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(malformed)?;
        let millis = parts
            .next()
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(malformed)?;

        Ok(Self { index, millis })
    }
}

/// Split a field line on its first `=`.
///
/// A line without `=` yields an empty value.
#[must_use]
pub fn split_field(line: &str) -> (&str, &str) {
    match line.split_once('=') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (line.trim(), ""),
    }
}

/// Parse one finite numeric value.
pub fn parse_number(key: &str, raw: &str) -> Result<f64, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::MissingValue(key.to_string()));
    }

    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

/// Parse a `0|1` flag. `1` is true, any other number false.
pub fn parse_flag(key: &str, raw: &str) -> Result<bool, ParseError> {
    Ok(parse_number(key, raw)? == 1.0)
}

fn parse_integer(key: &str, raw: &str) -> Result<i32, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::MissingValue(key.to_string()));
    }

    raw.parse::<i32>().map_err(|_| ParseError::InvalidNumber {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_list<T, const N: usize>(
    key: &str,
    raw: &str,
    parse: impl Fn(&str, &str) -> Result<T, ParseError>,
) -> Result<[T; N], ParseError>
where
    T: Copy + Default,
{
    if raw.trim().is_empty() {
        return Err(ParseError::MissingValue(key.to_string()));
    }

    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != N {
        return Err(ParseError::WrongArity {
            key: key.to_string(),
            expected: N,
            found: parts.len(),
        });
    }

    let mut values = [T::default(); N];
    for (slot, part) in values.iter_mut().zip(parts) {
        *slot = parse(key, part)?;
    }

    Ok(values)
}

/// Parse the value list of an `S=` line.
pub fn parse_rssi(raw: &str) -> Result<RssiReading, ParseError> {
    let values = parse_list::<i32, RSSI_FIELD_COUNT>("S", raw, parse_integer)?;
    Ok(RssiReading::from_values(values))
}

/// Parse the value list of a `P=` line.
pub fn parse_panel(raw: &str) -> Result<PanelReading, ParseError> {
    let values = parse_list::<i32, PANEL_FIELD_COUNT>("P", raw, parse_integer)?;
    Ok(PanelReading::from_values(values))
}

/// Parse the value list of a `GPS=` line.
///
/// # Examples
///
/// ```
/// use ground_station::telemetry::fields::parse_gps;
///
/// let fix = parse_gps("0,0,30,0,0,0,-9999.90,-9999.90,-9999.90")?;
/// assert_eq!(fix.year, 2000);
/// assert!((fix.latitude + 0.99999).abs() < 1e-9);
/// # Ok::<(), ground_station::telemetry::fields::ParseError>(())
/// ```
pub fn parse_gps(raw: &str) -> Result<GpsFix, ParseError> {
    let values = parse_list::<f64, GPS_FIELD_COUNT>("GPS", raw, parse_number)?;
    Ok(GpsFix::from_raw(values))
}

/// Parse a field line
///
/// # Arguments
///
/// * `line` - A `key=value` line (not an index marker)
///
/// # Returns
///
/// * `Ok(Some(Field))` - Known key with a valid value
/// * `Ok(None)` - Unknown key
///
/// # Errors
///
/// Returns error if the value of a known key does not parse.
pub fn parse_field(line: &str) -> Result<Option<Field>, ParseError> {
    let (name, raw) = split_field(line);
    let Some(key) = FieldKey::from_name(name) else {
        return Ok(None);
    };

    let field = match key {
        FieldKey::Temperature => Field::Temperature(parse_number(name, raw)?),
        FieldKey::AnalogTemperature => Field::AnalogTemperature(parse_number(name, raw)?),
        FieldKey::Pressure => Field::Pressure(parse_number(name, raw)?),
        FieldKey::Altitude => Field::Altitude(parse_number(name, raw)?),
        FieldKey::Ping => Field::Ping(parse_integer(name, raw)?),
        FieldKey::Open => Field::Open(parse_flag(name, raw)?),
        FieldKey::HasBarometer => Field::HasBarometer(parse_flag(name, raw)?),
        FieldKey::Rssi => Field::Rssi(parse_rssi(raw)?),
        FieldKey::Panel => Field::Panel(parse_panel(raw)?),
        FieldKey::Gps => Field::Gps(parse_gps(raw)?),
    };

    Ok(Some(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_round_trip() {
        for name in ["T", "T2", "PRS", "ALT", "PING", "OPN", "BMP", "S", "P", "GPS"] {
            let key = FieldKey::from_name(name).expect("known key");
            assert_eq!(key.name(), name);
        }
        assert_eq!(FieldKey::from_name("HUM"), None);
        assert_eq!(FieldKey::from_name("t"), None, "Keys are case sensitive");
    }

    #[test]
    fn test_parse_scalar_fields() {
        assert_eq!(parse_field("T=-1.00").unwrap(), Some(Field::Temperature(-1.0)));
        assert_eq!(parse_field("T2=379").unwrap(), Some(Field::AnalogTemperature(379.0)));
        assert_eq!(parse_field("PRS=1013.25").unwrap(), Some(Field::Pressure(1013.25)));
        assert_eq!(parse_field("ALT=120.5").unwrap(), Some(Field::Altitude(120.5)));
        assert_eq!(parse_field("PING=3").unwrap(), Some(Field::Ping(3)));
    }

    #[test]
    fn test_ping_must_be_integer() {
        assert!(matches!(parse_field("PING=1.7"), Err(ParseError::InvalidNumber { .. })));
        assert!(matches!(parse_field("PING=1e12"), Err(ParseError::InvalidNumber { .. })));
        assert_eq!(parse_field("PING=-2").unwrap(), Some(Field::Ping(-2)));
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(parse_field("OPN=1").unwrap(), Some(Field::Open(true)));
        assert_eq!(parse_field("OPN=0").unwrap(), Some(Field::Open(false)));
        assert_eq!(parse_field("BMP=2").unwrap(), Some(Field::HasBarometer(false)));
    }

    #[test]
    fn test_parse_trailing_carriage_return() {
        assert_eq!(parse_field("T=21.5\r").unwrap(), Some(Field::Temperature(21.5)));
    }

    #[test]
    fn test_parse_rssi_and_panel() {
        let rssi = parse_rssi("-40,-61,-72,-80").unwrap();
        assert_eq!(rssi, RssiReading::from_values([-40, -61, -72, -80]));

        let panels = parse_panel("365,355,356,386").unwrap();
        assert_eq!(panels.get(0), Some(365));
        assert_eq!(panels.get(3), Some(386));
    }

    #[test]
    fn test_parse_gps_order() {
        let fix = parse_gps("12,6,54,10,30,15,598765,107543,1234500").unwrap();
        assert_eq!((fix.day, fix.month, fix.year), (12, 6, 2024));
        assert_eq!((fix.hour, fix.minute, fix.second), (10, 30, 15));
        assert!((fix.latitude - 59.8765).abs() < 1e-9);
        assert!((fix.longitude - 10.7543).abs() < 1e-9);
        assert!((fix.altitude - 123.45).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_arity() {
        let err = parse_rssi("1,2,3").unwrap_err();
        assert_eq!(
            err,
            ParseError::WrongArity { key: "S".to_string(), expected: 4, found: 3 }
        );
        assert!(matches!(parse_gps("1,2"), Err(ParseError::WrongArity { found: 2, .. })));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(matches!(parse_field("T=abc"), Err(ParseError::InvalidNumber { .. })));
        assert!(matches!(parse_field("T=NaN"), Err(ParseError::InvalidNumber { .. })));
        assert!(matches!(parse_field("ALT=inf"), Err(ParseError::InvalidNumber { .. })));
        assert!(matches!(parse_field("PRS=-infinity"), Err(ParseError::InvalidNumber { .. })));
        assert!(matches!(parse_panel("1,2,x,4"), Err(ParseError::InvalidNumber { .. })));
        assert_eq!(parse_field("PRS="), Err(ParseError::MissingValue("PRS".to_string())));
        assert_eq!(parse_field("GPS"), Err(ParseError::MissingValue("GPS".to_string())));
    }

    #[test]
    fn test_unknown_key_is_not_an_error() {
        assert_eq!(parse_field("HUM=45").unwrap(), None);
    }

    #[test]
    fn test_index_marker() {
        assert_eq!(
            IndexMarker::parse("I 12 4500").unwrap(),
            IndexMarker { index: 12, millis: 4500 }
        );
        assert_eq!(IndexMarker::parse("I 12 4500\r").unwrap().millis, 4500);
        assert!(IndexMarker::parse("I 12").is_err());
        assert!(IndexMarker::parse("I x 4500").is_err());
        assert!(IndexMarker::parse("INFO 1 2").is_err());
    }

    #[test]
    fn test_split_field() {
        assert_eq!(split_field("GPS=1,2"), ("GPS", "1,2"));
        assert_eq!(split_field("BMP"), ("BMP", ""));
    }
}

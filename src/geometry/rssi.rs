//! RSSI to distance conversion (log-distance path loss, exponent 2).

/// Default one-meter reference reading in dBm.
pub const DEFAULT_ONE_METER_RSSI: f64 = -60.0;

/// Default calibration transmit power in dBm.
pub const DEFAULT_TX_POWER_DBM: f64 = 17.0;

/// Estimate the distance in meters for a received signal strength
///
/// `distance = 10 ^ ((tx_power - rssi - (tx_power - one_meter_rssi)) / 20)`
///
/// # Arguments
///
/// * `rssi` - Received signal strength (dBm)
/// * `tx_power` - Calibration transmit power (dBm)
/// * `one_meter_rssi` - Reading expected at one meter for this station (dBm)
///
/// # Examples
///
/// ```
/// use ground_station::geometry::rssi::rssi_to_distance;
///
/// // At the one-meter reference the distance is one meter.
/// assert!((rssi_to_distance(-60.0, 17.0, -60.0) - 1.0).abs() < 1e-12);
/// // Every 20 dB of extra loss is a factor of ten.
/// assert!((rssi_to_distance(-80.0, 17.0, -60.0) - 10.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn rssi_to_distance(rssi: f64, tx_power: f64, one_meter_rssi: f64) -> f64 {
    let path_loss_one_meter = tx_power - one_meter_rssi;
    10f64.powf((tx_power - rssi - path_loss_one_meter) / 20.0)
}

//! Three-point trilateration in a local ground plane.
//!
//! Plane coordinates are `(east, north)`. Station 0 sits at the origin and
//! station 1 on the east axis; station 2 is free. The solution is the standard
//! linear multilateration system:
//!
//! ```text
//! x = (R1² - R2² + u²) / 2u
//! y = (R1² - R3² + vx² + vy² - 2·vx·x) / 2vy
//! h = sqrt(|R1² - x² - y²|)
//! ```
//!
//! The absolute value only keeps small negative residuals from producing NaN.
//! Inconsistent distances still give a point; callers filter it by bounds.

use nalgebra::{Vector2, Vector3};

/// Layouts closer to degenerate than this are rejected.
const MIN_BASELINE_M: f64 = 1e-9;

/// Solve for the target position
///
/// # Arguments
///
/// * `stations` - Plane positions: `[origin, (u, _) on the east axis, (vx, vy)]`
/// * `distances` - Estimated ranges `[R1, R2, R3]` to the three stations
///
/// # Returns
///
/// * `Some((x, y, h))` - East, north and perpendicular offset
/// * `None` - Station 1 at the origin or station 2 on the east axis
///
/// # Examples
///
/// ```
/// use ground_station::geometry::trilateration::trilaterate;
/// use nalgebra::Vector2;
///
/// let stations = [Vector2::new(0.0, 0.0), Vector2::new(100.0, 0.0), Vector2::new(0.0, 100.0)];
/// let r = 50.0_f64.hypot(50.0);
/// let p = trilaterate(stations, [r, r, r]).unwrap();
/// assert!((p.x - 50.0).abs() < 1e-9 && (p.y - 50.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn trilaterate(stations: [Vector2<f64>; 3], distances: [f64; 3]) -> Option<Vector3<f64>> {
    let u = stations[1].x;
    let vx = stations[2].x;
    let vy = stations[2].y;

    if u.abs() < MIN_BASELINE_M || vy.abs() < MIN_BASELINE_M {
        return None;
    }

    let [r1, r2, r3] = distances;

    let x = (r1 * r1 - r2 * r2 + u * u) / (2.0 * u);
    let y = (r1 * r1 - r3 * r3 + vx * vx + vy * vy - 2.0 * vx * x) / (2.0 * vy);
    let h = (r1 * r1 - x * x - y * y).abs().sqrt();

    Some(Vector3::new(x, y, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_distances_land_near_centroid() {
        let stations = [Vector2::new(0.0, 0.0), Vector2::new(100.0, 0.0), Vector2::new(50.0, 86.6)];
        let p = trilaterate(stations, [60.0, 60.0, 60.0]).unwrap();

        let centroid = (stations[0] + stations[1] + stations[2]) / 3.0;
        assert!((p.x - centroid.x).abs() < 0.01, "x = {}", p.x);
        assert!((p.y - centroid.y).abs() < 0.01, "y = {}", p.y);
        assert!(p.z >= 0.0);
    }

    #[test]
    fn test_recovers_known_point() {
        let target = Vector3::new(30.0, 40.0, 20.0);
        let stations = [Vector2::new(0.0, 0.0), Vector2::new(200.0, 0.0), Vector2::new(-50.0, 150.0)];
        let distances = stations.map(|s| (Vector3::new(s.x, s.y, 0.0) - target).norm());

        let p = trilaterate(stations, distances).unwrap();
        assert!((p - target).norm() < 1e-6, "Solved {:?}", p);
    }

    #[test]
    fn test_inconsistent_distances_stay_finite() {
        let stations = [Vector2::new(0.0, 0.0), Vector2::new(100.0, 0.0), Vector2::new(50.0, 80.0)];
        let p = trilaterate(stations, [1.0, 500.0, 2.0]).unwrap();
        assert!(p.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_degenerate_layouts() {
        let on_axis = [Vector2::new(0.0, 0.0), Vector2::new(100.0, 0.0), Vector2::new(50.0, 0.0)];
        assert!(trilaterate(on_axis, [1.0, 1.0, 1.0]).is_none());

        let collapsed = [Vector2::new(0.0, 0.0), Vector2::new(0.0, 0.0), Vector2::new(50.0, 50.0)];
        assert!(trilaterate(collapsed, [1.0, 1.0, 1.0]).is_none());
    }
}

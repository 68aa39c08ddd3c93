//! Validity filter for derived positions.

use nalgebra::Vector3;

/// Default extent of the plausible flight area, in meters from the origin.
pub const DEFAULT_MAX_EXTENT_M: f64 = 3000.0;

/// Box outside of which a derived point is treated as "no data".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointBounds {
    max_extent: f64,
}

impl Default for PointBounds {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXTENT_M)
    }
}

impl PointBounds {
    #[must_use]
    pub fn new(max_extent: f64) -> Self {
        Self {
            max_extent: max_extent.abs(),
        }
    }

    #[must_use]
    pub fn max_extent(&self) -> f64 {
        self.max_extent
    }

    /// A point is valid when no coordinate is NaN and every coordinate lies
    /// within `[-max_extent, max_extent]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ground_station::geometry::bounds::PointBounds;
    /// use nalgebra::Vector3;
    ///
    /// let bounds = PointBounds::default();
    /// assert!(bounds.contains(&Vector3::new(-3000.0, 10.0, 2999.0)));
    /// assert!(!bounds.contains(&Vector3::new(0.0, f64::NAN, 0.0)));
    /// assert!(!bounds.contains(&Vector3::new(3000.5, 0.0, 0.0)));
    /// ```
    #[must_use]
    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        point
            .iter()
            .all(|c| !c.is_nan() && c.abs() <= self.max_extent)
    }

    /// Keep the point only if it is valid.
    #[must_use]
    pub fn filter(&self, point: Vector3<f64>) -> Option<Vector3<f64>> {
        self.contains(&point).then_some(point)
    }
}

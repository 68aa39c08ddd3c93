//! # Geometry Module
//!
//! Position derivation from telemetry records.
//!
//! ## Local frame
//!
//! | Axis | Direction |
//! |------|-----------|
//! | X | west |
//! | Y | up (barometric altitude above base) |
//! | Z | north |
//!
//! Every derived point passes through [`bounds::PointBounds`]; a point that
//! fails it is a gap, never a zero.

pub mod bounds;
pub mod interpolation;
pub mod projection;
pub mod rssi;
pub mod stations;
pub mod trilateration;

pub use bounds::PointBounds;
pub use interpolation::GpsTrack;
pub use stations::StationLayout;

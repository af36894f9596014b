//! Core types and utilities

pub mod geo;
pub mod signals;
pub mod spatial;

pub use geo::{GeoPoint, LocalProjection, EARTH_RADIUS_KM, KM_PER_DEGREE};
pub use signals::*;
pub use spatial::{Nearest, SpatialIndex};

//! Geographic points and the planar projection used for spatial joins
//!
//! Observations and reference layers arrive as WGS84 latitude/longitude.
//! Nearest-neighbour joins run on a local equirectangular plane in
//! kilometres, which keeps distances comparable across layers without
//! pulling in a full projection library.

use crate::error::{EcoFlareError, Result};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Mean Earth radius (km), IUGG value.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Flat-Earth conversion used by forecast head projection (≈ km per degree).
pub const KM_PER_DEGREE: f64 = 111.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point without validation.
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a point, rejecting non-finite or out-of-range coordinates.
    ///
    /// `context` names the source of the point in the resulting error.
    pub fn validated(latitude: f64, longitude: f64, context: &str) -> Result<Self> {
        let point = Self::new(latitude, longitude);
        if point.is_valid() {
            Ok(point)
        } else {
            Err(EcoFlareError::invalid_geometry(context, latitude, longitude))
        }
    }

    /// True when both coordinates are finite and inside WGS84 bounds.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Move `distance_km` along `bearing_deg` (0 = north, 90 = east) using
    /// the flat-Earth approximation of [`KM_PER_DEGREE`] for both axes.
    ///
    /// # Formula
    /// ```text
    /// lat' = lat + (d / 111) × cos(θ)
    /// lon' = lon + (d / 111) × sin(θ)
    /// ```
    pub fn offset_flat(&self, distance_km: f64, bearing_deg: f64) -> Self {
        let theta = bearing_deg.to_radians();
        let degrees = distance_km / KM_PER_DEGREE;
        Self::new(
            self.latitude + degrees * theta.cos(),
            self.longitude + degrees * theta.sin(),
        )
    }

    /// Great-circle distance to another point (km).
    pub fn haversine_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// Equirectangular projection anchored on a reference latitude.
///
/// # Formula
/// ```text
/// x = R × λ × cos(φ₀)
/// y = R × φ
/// ```
///
/// Accurate to a few percent within several hundred kilometres of `φ₀`,
/// which is the scale of a regional reference layer set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalProjection {
    reference_latitude: f64,
    cos_reference: f64,
}

impl LocalProjection {
    /// Create a projection anchored on `reference_latitude` (degrees).
    pub fn new(reference_latitude: f64) -> Self {
        let reference_latitude = reference_latitude.clamp(-89.0, 89.0);
        Self {
            reference_latitude,
            cos_reference: reference_latitude.to_radians().cos(),
        }
    }

    /// Reference latitude in degrees.
    pub fn reference_latitude(&self) -> f64 {
        self.reference_latitude
    }

    /// Project a point to planar kilometres.
    #[inline]
    pub fn project(&self, point: &GeoPoint) -> Point2<f64> {
        Point2::new(
            EARTH_RADIUS_KM * point.longitude.to_radians() * self.cos_reference,
            EARTH_RADIUS_KM * point.latitude.to_radians(),
        )
    }
}

impl Default for LocalProjection {
    fn default() -> Self {
        Self::new(0.0)
    }
}

//! Terrain refinement of the spread rate
//!
//! # Formula
//! ```text
//! R' = R × max(0, 1 + 0.03 × tan(slope)) × max(0, 1 + 0.001 × elevation)
//! ```
//!
//! Slope is clamped to ±[`MAX_SLOPE_DEG`] so the tangent stays bounded, and
//! non-finite terrain values count as flat ground at sea level.

use serde::{Deserialize, Serialize};

/// Steepest slope the adjustment accepts (degrees)
pub const MAX_SLOPE_DEG: f64 = 89.0;

/// Local terrain at the fire origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Terrain {
    /// Slope angle in degrees
    pub slope_deg: f64,
    /// Elevation above sea level in metres
    pub elevation_m: f64,
}

impl Terrain {
    pub fn new(slope_deg: f64, elevation_m: f64) -> Self {
        Self {
            slope_deg,
            elevation_m,
        }
    }

    /// Combined slope and elevation multiplier.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        let slope_deg = finite_or_zero(self.slope_deg).clamp(-MAX_SLOPE_DEG, MAX_SLOPE_DEG);
        let slope = (1.0 + 0.03 * slope_deg.to_radians().tan()).max(0.0);
        let elevation = (1.0 + 0.001 * finite_or_zero(self.elevation_m)).max(0.0);
        slope * elevation
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Apply the terrain multiplier to a spread rate.
#[must_use]
pub fn adjust_for_terrain(rate_kmh: f64, terrain: &Terrain) -> f64 {
    rate_kmh * terrain.multiplier()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_sea_level_is_neutral() {
        assert_relative_eq!(adjust_for_terrain(1.7, &Terrain::default()), 1.7);
    }

    #[test]
    fn test_slope_and_elevation() {
        let terrain = Terrain::new(45.0, 500.0);
        assert_relative_eq!(
            adjust_for_terrain(2.0, &terrain),
            2.0 * 1.03 * 1.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_uphill_is_faster() {
        let flat = adjust_for_terrain(1.0, &Terrain::new(0.0, 200.0));
        let steep = adjust_for_terrain(1.0, &Terrain::new(20.0, 200.0));
        assert!(steep > flat);
    }

    #[test]
    fn test_extreme_terrain_stays_bounded_and_non_negative() {
        let cliff = Terrain::new(90.0, 0.0).multiplier();
        assert!(cliff.is_finite());
        assert_relative_eq!(cliff, 1.0 + 0.03 * 89.0_f64.to_radians().tan(), epsilon = 1e-12);
        assert_relative_eq!(
            Terrain::new(135.0, 0.0).multiplier(),
            cliff,
            epsilon = 1e-12
        );

        assert_eq!(Terrain::new(-89.5, 0.0).multiplier(), 0.0);
        assert_eq!(Terrain::new(0.0, -2500.0).multiplier(), 0.0);
        assert_eq!(Terrain::new(f64::NAN, f64::INFINITY).multiplier(), 1.0);
        assert!(adjust_for_terrain(1.4, &Terrain::new(-89.9, -4000.0)) >= 0.0);
    }
}

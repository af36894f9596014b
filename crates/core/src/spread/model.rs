//! Learned spread-rate models
//!
//! The projector scores an injected [`SpreadRateModel`] against
//! [`SpreadFeatures`]. [`LinearSpreadModel`] is the bundled artifact: a
//! JSON linear regression that carries its own one-hot encoding, so no
//! separate preprocessor has to be loaded beside it.

use super::physics::{SpreadCause, VegetationType};
use super::terrain::Terrain;
use crate::error::{EcoFlareError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Distances to features that slow or stop the fire front (km).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Inhibitors {
    pub firebreak_distance_km: Option<f64>,
    pub water_body_distance_km: Option<f64>,
}

/// Model input for one forecast request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadFeatures {
    pub latitude: f64,
    pub longitude: f64,
    pub vegetation: VegetationType,
    pub wind_speed_kmh: f64,
    pub wind_direction_deg: f64,
    pub moisture_pct: f64,
    pub cause: SpreadCause,
    /// Hours between ignition and forecast issue
    pub elapsed_hours: f64,
    pub terrain: Option<Terrain>,
    pub inhibitors: Inhibitors,
}

/// A trained spread-rate regressor (km/h).
pub trait SpreadRateModel: Send + Sync {
    fn predict_rate(&self, features: &SpreadFeatures) -> Result<f64>;
}

/// Numeric-feature weights; absent optional inputs contribute nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericCoefficients {
    pub latitude: f64,
    pub longitude: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub moisture: f64,
    pub elapsed_hours: f64,
    pub slope_deg: f64,
    pub elevation_m: f64,
    pub firebreak_distance_km: f64,
    pub water_body_distance_km: f64,
}

impl NumericCoefficients {
    fn as_array(&self) -> [f64; 10] {
        [
            self.latitude,
            self.longitude,
            self.wind_speed,
            self.wind_direction,
            self.moisture,
            self.elapsed_hours,
            self.slope_deg,
            self.elevation_m,
            self.firebreak_distance_km,
            self.water_body_distance_km,
        ]
    }
}

/// Linear spread-rate artifact.
///
/// # Formula
/// ```text
/// rate = intercept + Σ coef_i × x_i + veg[vegetation] + cause[cause]
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearSpreadModel {
    pub intercept: f64,
    pub numeric: NumericCoefficients,
    /// One-hot weights per vegetation type (missing types weigh 0)
    pub vegetation: FxHashMap<VegetationType, f64>,
    /// One-hot weights per cause (missing causes weigh 0)
    pub cause: FxHashMap<SpreadCause, f64>,
}

impl LinearSpreadModel {
    /// Parse and validate a JSON artifact.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Load and validate a JSON artifact from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Every coefficient must be finite.
    pub fn validate(&self) -> Result<()> {
        let all_finite = std::iter::once(self.intercept)
            .chain(self.numeric.as_array())
            .chain(self.vegetation.values().copied())
            .chain(self.cause.values().copied())
            .all(f64::is_finite);
        if all_finite {
            Ok(())
        } else {
            Err(EcoFlareError::Artifact(
                "spread model has non-finite coefficients".into(),
            ))
        }
    }
}

impl SpreadRateModel for LinearSpreadModel {
    fn predict_rate(&self, features: &SpreadFeatures) -> Result<f64> {
        let terrain = features.terrain;
        let inputs = [
            Some(features.latitude),
            Some(features.longitude),
            Some(features.wind_speed_kmh),
            Some(features.wind_direction_deg),
            Some(features.moisture_pct),
            Some(features.elapsed_hours),
            terrain.map(|t| t.slope_deg),
            terrain.map(|t| t.elevation_m),
            features.inhibitors.firebreak_distance_km,
            features.inhibitors.water_body_distance_km,
        ];

        let linear: f64 = self
            .numeric
            .as_array()
            .iter()
            .zip(inputs)
            .filter_map(|(coef, x)| x.map(|x| coef * x))
            .sum();

        let vegetation = self
            .vegetation
            .get(&features.vegetation)
            .copied()
            .unwrap_or(0.0);
        let cause = self.cause.get(&features.cause).copied().unwrap_or(0.0);

        Ok(self.intercept + linear + vegetation + cause)
    }
}

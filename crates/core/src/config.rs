//! Pipeline configuration
//!
//! Every section has sensible defaults so a partial JSON document (or none
//! at all) yields a working configuration. Values that encode a caller
//! contract, such as blend weights and the forecast horizon, are checked by
//! [`PipelineConfig::validate`] and never silently repaired.

use crate::error::{EcoFlareError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shortest allowed forecast horizon (hours)
pub const MIN_HORIZON_HOURS: u32 = 1;
/// Longest allowed forecast horizon (hours)
pub const MAX_HORIZON_HOURS: u32 = 24;

/// Tolerance when checking that blend weights sum to one
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Spatial join settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// A lightning strike counts as recent within this many hours before the observation
    pub lightning_window_hours: f64,
    /// Edge length of spatial index cells (km)
    pub grid_cell_km: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            lightning_window_hours: 6.0,
            grid_cell_km: 25.0,
        }
    }
}

/// Cause classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Reject class indices outside the cause label set instead of wrapping
    pub strict_class_labels: bool,
    /// Compute per-feature attribution weights when the model supports it
    pub explain: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strict_class_labels: false,
            explain: true,
        }
    }
}

/// Physics/model blend weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub physics: f64,
    pub ml: f64,
}

impl BlendWeights {
    pub const fn new(physics: f64, ml: f64) -> Self {
        Self { physics, ml }
    }

    /// Weights must be finite, non-negative and sum to one.
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [("physics", self.physics), ("ml", self.ml)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EcoFlareError::configuration(format!(
                    "{name} weight must be finite and non-negative, got {weight}"
                )));
            }
        }
        let sum = self.physics + self.ml;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EcoFlareError::configuration(format!(
                "blend weights must sum to 1, got {} + {} = {sum}",
                self.physics, self.ml
            )));
        }
        Ok(())
    }
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

/// Check a forecast horizon against the allowed range.
pub fn validate_horizon(horizon_hours: u32) -> Result<()> {
    if (MIN_HORIZON_HOURS..=MAX_HORIZON_HOURS).contains(&horizon_hours) {
        Ok(())
    } else {
        Err(EcoFlareError::configuration(format!(
            "forecast horizon must be within {MIN_HORIZON_HOURS}..={MAX_HORIZON_HOURS} hours, \
             got {horizon_hours}"
        )))
    }
}

/// Forecast defaults used when the caller does not override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub physics_weight: f64,
    pub ml_weight: f64,
    pub horizon_hours: u32,
}

impl ForecastConfig {
    pub fn weights(&self) -> BlendWeights {
        BlendWeights::new(self.physics_weight, self.ml_weight)
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            physics_weight: 0.5,
            ml_weight: 0.5,
            horizon_hours: 12,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub enrichment: EnrichmentConfig,
    pub classifier: ClassifierConfig,
    pub forecast: ForecastConfig,
}

impl PipelineConfig {
    /// Parse a JSON document; missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Surface contract violations to the caller.
    pub fn validate(&self) -> Result<()> {
        self.forecast.weights().validate()?;
        validate_horizon(self.forecast.horizon_hours)?;

        if !(self.enrichment.lightning_window_hours.is_finite()
            && self.enrichment.lightning_window_hours >= 0.0)
        {
            return Err(EcoFlareError::configuration(format!(
                "lightning window must be a non-negative number of hours, got {}",
                self.enrichment.lightning_window_hours
            )));
        }
        if !(self.enrichment.grid_cell_km.is_finite() && self.enrichment.grid_cell_km > 0.0) {
            return Err(EcoFlareError::configuration(format!(
                "grid cell size must be positive, got {}",
                self.enrichment.grid_cell_km
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.forecast.horizon_hours, 12);
        assert_eq!(config.enrichment.lightning_window_hours, 6.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            PipelineConfig::from_json_str(r#"{"forecast": {"horizon_hours": 6}}"#).unwrap();
        assert_eq!(config.forecast.horizon_hours, 6);
        assert_eq!(config.forecast.physics_weight, 0.5);
        assert!(config.classifier.explain);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        assert!(BlendWeights::new(0.7, 0.3).validate().is_ok());
        assert!(BlendWeights::new(1.0, 0.0).validate().is_ok());
        let err = BlendWeights::new(0.6, 0.6).validate().unwrap_err();
        assert!(matches!(err, EcoFlareError::Configuration(_)));
        assert!(BlendWeights::new(1.5, -0.5).validate().is_err());
        assert!(BlendWeights::new(f64::NAN, 0.5).validate().is_err());
    }

    #[test]
    fn test_horizon_bounds() {
        assert!(validate_horizon(0).is_err());
        assert!(validate_horizon(1).is_ok());
        assert!(validate_horizon(24).is_ok());
        assert!(validate_horizon(25).is_err());
    }

    #[test]
    fn test_invalid_config_document_rejected() {
        let err =
            PipelineConfig::from_json_str(r#"{"forecast": {"horizon_hours": 48}}"#).unwrap_err();
        assert!(matches!(err, EcoFlareError::Configuration(_)));
    }
}

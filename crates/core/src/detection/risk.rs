//! Risk labels derived from individual sources
//!
//! Sensor and vegetation risk are simple additive/boolean scorecards. The
//! composite overall risk blends them with weather into a single label for
//! operator display.

use crate::core_types::{SensorReading, VegetationProfile, WeatherSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor scorecard thresholds and weights.
pub mod sensor_score {
    /// Sensor temperature above which heat contributes (°C)
    pub const HOT_TEMPERATURE: f64 = 30.0;
    /// Smoke level above which smoke contributes (0-100 scale)
    pub const SMOKE_LEVEL: f64 = 50.0;

    pub const HEAT_POINTS: u32 = 30;
    pub const SMOKE_POINTS: u32 = 40;
    pub const FLAME_POINTS: u32 = 30;

    /// Minimum score for HIGH
    pub const HIGH: u32 = 70;
    /// Minimum score for MEDIUM
    pub const MEDIUM: u32 = 40;
}

/// Risk level reported by a ground sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorRisk {
    Low,
    Medium,
    High,
}

impl SensorRisk {
    /// Score a sensor reading.
    ///
    /// # Scorecard
    /// ```text
    /// +30 if temperature > 30 °C
    /// +40 if smoke_level > 50
    /// +30 if flame detected
    /// HIGH ≥ 70, MEDIUM ≥ 40, LOW otherwise
    /// ```
    ///
    /// An absent temperature or smoke level scores nothing.
    pub fn assess(reading: &SensorReading) -> Self {
        let mut score = 0;
        if reading.temperature.is_some_and(|t| t > sensor_score::HOT_TEMPERATURE) {
            score += sensor_score::HEAT_POINTS;
        }
        if reading.smoke_level.is_some_and(|s| s > sensor_score::SMOKE_LEVEL) {
            score += sensor_score::SMOKE_POINTS;
        }
        if reading.flame_detected {
            score += sensor_score::FLAME_POINTS;
        }

        match score {
            s if s >= sensor_score::HIGH => SensorRisk::High,
            s if s >= sensor_score::MEDIUM => SensorRisk::Medium,
            _ => SensorRisk::Low,
        }
    }

    /// Whether this risk level is enough for the sensor to vote for fire.
    pub fn is_elevated(self) -> bool {
        matches!(self, SensorRisk::High | SensorRisk::Medium)
    }

    fn composite_score(risk: Option<Self>) -> f64 {
        match risk {
            Some(SensorRisk::High) => 1.0,
            Some(SensorRisk::Medium) => 0.6,
            Some(SensorRisk::Low) => 0.3,
            None => 0.4,
        }
    }
}

impl fmt::Display for SensorRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensorRisk::Low => "LOW",
            SensorRisk::Medium => "MEDIUM",
            SensorRisk::High => "HIGH",
        })
    }
}

/// Fire risk implied by the land cover around an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VegetationRisk {
    Unknown,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl VegetationRisk {
    /// Classify a vegetation profile; `None` yields `Unknown`.
    pub fn assess(profile: Option<&VegetationProfile>) -> Self {
        let Some(profile) = profile else {
            return VegetationRisk::Unknown;
        };

        match (profile.has_forest, profile.has_grassland, profile.has_wetland) {
            (true, true, _) => VegetationRisk::VeryHigh,
            (true, false, _) | (false, true, _) => VegetationRisk::High,
            (false, false, true) => VegetationRisk::Low,
            (false, false, false) => VegetationRisk::Medium,
        }
    }

    fn composite_score(self) -> f64 {
        match self {
            VegetationRisk::VeryHigh => 1.0,
            VegetationRisk::High => 0.8,
            VegetationRisk::Medium => 0.5,
            VegetationRisk::Low => 0.2,
            VegetationRisk::Unknown => 0.4,
        }
    }
}

impl fmt::Display for VegetationRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VegetationRisk::Unknown => "UNKNOWN",
            VegetationRisk::Low => "LOW",
            VegetationRisk::Medium => "MEDIUM",
            VegetationRisk::High => "HIGH",
            VegetationRisk::VeryHigh => "VERY_HIGH",
        })
    }
}

/// Composite risk score threshold constants.
///
/// Note: Rust `Range` types use **inclusive lower bound and exclusive upper bound** [a, b).
pub mod overall_ranges {
    use std::ops::{Range, RangeFrom};

    pub const LOW: Range<f64> = f64::NEG_INFINITY..0.3;
    pub const MEDIUM: Range<f64> = 0.3..0.6;
    pub const HIGH: Range<f64> = 0.6..0.8;
    pub const VERY_HIGH: RangeFrom<f64> = 0.8..;
}

/// Overall danger label combining vegetation, weather and sensor risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallRisk {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl OverallRisk {
    /// Weighted composite score.
    ///
    /// # Formula
    /// ```text
    /// score = 0.4 × veg + 0.3 × (wind / 30) + 0.2 × (1 − humidity / 100) + 0.1 × sensor
    /// ```
    ///
    /// Missing wind counts as calm (0 km/h) and missing humidity as 50 %.
    pub fn score(
        weather: Option<&WeatherSnapshot>,
        vegetation: VegetationRisk,
        sensor: Option<SensorRisk>,
    ) -> f64 {
        let wind = weather.and_then(WeatherSnapshot::wind_speed).unwrap_or(0.0);
        let humidity = weather.and_then(WeatherSnapshot::humidity).unwrap_or(50.0);

        0.4 * vegetation.composite_score()
            + 0.3 * (wind / 30.0)
            + 0.2 * (1.0 - humidity / 100.0)
            + 0.1 * SensorRisk::composite_score(sensor)
    }

    /// Classify the composite score. See [`overall_ranges`].
    pub fn assess(
        weather: Option<&WeatherSnapshot>,
        vegetation: VegetationRisk,
        sensor: Option<SensorRisk>,
    ) -> Self {
        let score = Self::score(weather, vegetation, sensor);
        match score {
            _ if overall_ranges::VERY_HIGH.contains(&score) => OverallRisk::VeryHigh,
            _ if overall_ranges::HIGH.contains(&score) => OverallRisk::High,
            _ if overall_ranges::MEDIUM.contains(&score) => OverallRisk::Medium,
            _ => OverallRisk::Low,
        }
    }
}

//! Empirical spread-rate model
//!
//! Closed-form head-fire rate of spread (km/h) from vegetation, wind, fuel
//! moisture and ignition cause. Each factor is a separate function so the
//! projector and tests can reason about them independently.
//!
//! # Formula
//! ```text
//! R = R_0(veg) × W(wind) × M(moisture) × C(cause)
//! ```
//!
//! Where:
//! - **R_0** = base rate for the vegetation type (km/h)
//! - **W** = `1 + (wind / 20)^1.5`, wind in km/h
//! - **M** = `max(0.2, 1 - moisture / 100)`, moisture in %
//! - **C** = ignition cause multiplier

use crate::attribution::CauseLabel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vegetation classes with a tabulated base spread rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum VegetationType {
    Grass,
    Shrub,
    MixedForest,
    BorealForest,
    DeciduousForest,
    Agricultural,
    /// Anything not in the table
    Other,
}

impl VegetationType {
    pub const ALL: [VegetationType; 7] = [
        VegetationType::Grass,
        VegetationType::Shrub,
        VegetationType::MixedForest,
        VegetationType::BorealForest,
        VegetationType::DeciduousForest,
        VegetationType::Agricultural,
        VegetationType::Other,
    ];

    /// Case-insensitive lookup; unknown names map to [`VegetationType::Other`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "grass" => VegetationType::Grass,
            "shrub" => VegetationType::Shrub,
            "mixed_forest" => VegetationType::MixedForest,
            "boreal_forest" => VegetationType::BorealForest,
            "deciduous_forest" => VegetationType::DeciduousForest,
            "agricultural" => VegetationType::Agricultural,
            _ => VegetationType::Other,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VegetationType::Grass => "grass",
            VegetationType::Shrub => "shrub",
            VegetationType::MixedForest => "mixed_forest",
            VegetationType::BorealForest => "boreal_forest",
            VegetationType::DeciduousForest => "deciduous_forest",
            VegetationType::Agricultural => "agricultural",
            VegetationType::Other => "other",
        }
    }

    /// Base rate of spread (km/h) before wind, moisture and cause.
    #[must_use]
    pub fn base_rate(self) -> f64 {
        match self {
            VegetationType::Grass => 2.5,
            VegetationType::Shrub => 1.8,
            VegetationType::MixedForest | VegetationType::Other => 1.2,
            VegetationType::BorealForest => 1.5,
            VegetationType::DeciduousForest => 0.8,
            VegetationType::Agricultural => 2.0,
        }
    }
}

impl From<String> for VegetationType {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl fmt::Display for VegetationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ignition cause as seen by the spread model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum SpreadCause {
    Lightning,
    Human,
    Equipment,
    Unknown,
}

impl SpreadCause {
    pub const ALL: [SpreadCause; 4] = [
        SpreadCause::Lightning,
        SpreadCause::Human,
        SpreadCause::Equipment,
        SpreadCause::Unknown,
    ];

    /// Case-insensitive lookup; unrecognised strings map to
    /// [`SpreadCause::Unknown`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "lightning" => SpreadCause::Lightning,
            "human" => SpreadCause::Human,
            "equipment" => SpreadCause::Equipment,
            _ => SpreadCause::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SpreadCause::Lightning => "lightning",
            SpreadCause::Human => "human",
            SpreadCause::Equipment => "equipment",
            SpreadCause::Unknown => "unknown",
        }
    }

    /// Spread multiplier for fires of this origin.
    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            SpreadCause::Lightning => 1.1,
            SpreadCause::Human => 1.3,
            SpreadCause::Equipment => 1.2,
            SpreadCause::Unknown => 1.0,
        }
    }
}

impl From<String> for SpreadCause {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<CauseLabel> for SpreadCause {
    fn from(label: CauseLabel) -> Self {
        match label {
            CauseLabel::Lightning => SpreadCause::Lightning,
            CauseLabel::HumanActivity => SpreadCause::Human,
            CauseLabel::EquipmentFailure => SpreadCause::Equipment,
            CauseLabel::SpontaneousCombustion => SpreadCause::Unknown,
        }
    }
}

impl fmt::Display for SpreadCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wind factor `1 + (wind / 20)^1.5`.
///
/// Negative speeds are treated as calm.
#[must_use]
pub fn wind_factor(wind_speed_kmh: f64) -> f64 {
    1.0 + (wind_speed_kmh.max(0.0) / 20.0).powf(1.5)
}

/// Moisture factor `max(0.2, 1 - moisture / 100)`.
#[must_use]
pub fn moisture_factor(moisture_pct: f64) -> f64 {
    (1.0 - moisture_pct / 100.0).max(0.2)
}

/// Rate of spread without the cause multiplier (km/h).
#[must_use]
pub fn base_spread_rate(vegetation: VegetationType, wind_speed_kmh: f64, moisture_pct: f64) -> f64 {
    vegetation.base_rate() * wind_factor(wind_speed_kmh) * moisture_factor(moisture_pct)
}

/// Rate of spread (km/h) with the cause multiplier applied once.
///
/// # Example
/// ```
/// use ecoflare_core::spread::{spread_rate, SpreadCause, VegetationType};
///
/// let rate = spread_rate(VegetationType::Grass, 0.0, 0.0, SpreadCause::Unknown);
/// assert!((rate - 2.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn spread_rate(
    vegetation: VegetationType,
    wind_speed_kmh: f64,
    moisture_pct: f64,
    cause: SpreadCause,
) -> f64 {
    base_spread_rate(vegetation, wind_speed_kmh, moisture_pct) * cause.multiplier()
}

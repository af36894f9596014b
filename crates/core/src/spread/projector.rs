//! Hybrid physics/model spread projection
//!
//! Blends the empirical rate with an optional learned rate, then walks the
//! fire forward in whole hours as an anisotropic ellipse whose head runs
//! downwind.
//!
//! # Formula
//! ```text
//! R   = w_p × R_physics + w_m × R_model
//! d_h = R × h
//! head = 3 × d_h,  flank = 0.5 × d_h
//! area = π × head × flank × 100            (ha)
//! conf = 0.95 - 0.03h - 0.01·wind/10 - 0.01·moisture/50 - 0.05·(C - 1)
//! ```
//!
//! Confidence is clamped to `[0.4, 0.95]`.

use super::model::{Inhibitors, SpreadFeatures, SpreadRateModel};
use super::physics::{spread_rate, SpreadCause, VegetationType};
use super::terrain::{adjust_for_terrain, Terrain};
use crate::config::{validate_horizon, BlendWeights};
use crate::core_types::GeoPoint;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Forward run as a multiple of the spread distance
pub const HEAD_RATIO: f64 = 3.0;
/// Lateral run as a multiple of the spread distance
pub const FLANK_RATIO: f64 = 0.5;
/// km² to hectares
pub const HECTARES_PER_KM2: f64 = 100.0;

/// Confidence schedule.
pub mod confidence {
    use std::ops::RangeInclusive;

    pub const INITIAL: f64 = 0.95;
    pub const DECAY_PER_HOUR: f64 = 0.03;
    /// Penalty per 10 km/h of wind
    pub const WIND_PENALTY: f64 = 0.01;
    /// Penalty per 50 % of fuel moisture
    pub const MOISTURE_PENALTY: f64 = 0.01;
    /// Penalty per unit of cause multiplier above 1
    pub const CAUSE_PENALTY: f64 = 0.05;
    pub const BOUNDS: RangeInclusive<f64> = 0.4..=0.95;
}

/// Surface wind driving the head fire.
///
/// Deserialised values are normalised as in [`WindState::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "WindRecord")]
pub struct WindState {
    pub speed_kmh: f64,
    /// Bearing the fire is pushed towards, 0 = north, 90 = east
    pub direction_deg: f64,
}

impl WindState {
    /// Clamp speed to `≥ 0` and wrap direction into `[0, 360)`.
    pub fn new(speed_kmh: f64, direction_deg: f64) -> Self {
        Self {
            speed_kmh: speed_kmh.max(0.0),
            direction_deg: direction_deg.rem_euclid(360.0),
        }
    }
}

/// Fuel at the fire origin.
///
/// Deserialised values are normalised as in [`VegetationState::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "VegetationRecord")]
pub struct VegetationState {
    #[serde(rename = "type")]
    pub vegetation_type: VegetationType,
    /// Fuel moisture (%)
    pub moisture_pct: f64,
}

impl VegetationState {
    /// Clamp moisture into `[0, 100]`.
    pub fn new(vegetation_type: VegetationType, moisture_pct: f64) -> Self {
        Self {
            vegetation_type,
            moisture_pct: moisture_pct.clamp(0.0, 100.0),
        }
    }
}

/// Wire form of [`WindState`] before normalisation.
#[derive(Deserialize)]
struct WindRecord {
    speed_kmh: f64,
    direction_deg: f64,
}

impl From<WindRecord> for WindState {
    fn from(raw: WindRecord) -> Self {
        WindState::new(raw.speed_kmh, raw.direction_deg)
    }
}

/// Wire form of [`VegetationState`] before normalisation.
#[derive(Deserialize)]
struct VegetationRecord {
    #[serde(rename = "type")]
    vegetation_type: VegetationType,
    moisture_pct: f64,
}

impl From<VegetationRecord> for VegetationState {
    fn from(raw: VegetationRecord) -> Self {
        VegetationState::new(raw.vegetation_type, raw.moisture_pct)
    }
}

/// Forecast danger class derived from the combined rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    /// Strict thresholds: > 3 extreme, > 2 high, > 1 medium.
    pub fn from_rate(rate_kmh: f64) -> Self {
        match rate_kmh {
            r if r > 3.0 => RiskLevel::Extreme,
            r if r > 2.0 => RiskLevel::High,
            r if r > 1.0 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Extreme => "EXTREME",
        };
        f.write_str(label)
    }
}

/// Fire state `hour` hours after issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadStepPrediction {
    pub hour: u32,
    pub timestamp: DateTime<Utc>,
    pub predicted_head_lat: f64,
    pub predicted_head_lon: f64,
    pub estimated_area_ha: f64,
    pub confidence: f64,
}

/// Complete forecast trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadForecast {
    pub origin: GeoPoint,
    /// Blended rate used for the trajectory (km/h)
    pub spread_rate_kmh: f64,
    pub physics_rate_kmh: f64,
    /// Model rate when a model was used successfully
    pub ml_rate_kmh: Option<f64>,
    pub dominant_direction_deg: f64,
    pub risk_level: RiskLevel,
    pub issued_at: DateTime<Utc>,
    pub predictions: Vec<SpreadStepPrediction>,
}

/// Inputs to one forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub origin: GeoPoint,
    pub wind: WindState,
    pub vegetation: VegetationState,
    pub cause: SpreadCause,
    /// Ignition (detection) time
    pub detected_at: DateTime<Utc>,
    /// Forecast issue time; defaults to `detected_at`
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    pub horizon_hours: u32,
    #[serde(default)]
    pub weights: BlendWeights,
    #[serde(default)]
    pub terrain: Option<Terrain>,
    #[serde(default)]
    pub inhibitors: Inhibitors,
}

impl ForecastRequest {
    /// Request with default weights, no terrain and no inhibitors.
    ///
    /// Wind and moisture are normalised as in [`WindState::new`] and
    /// [`VegetationState::new`].
    pub fn new(
        origin: GeoPoint,
        wind: WindState,
        vegetation: VegetationState,
        cause: SpreadCause,
        detected_at: DateTime<Utc>,
        horizon_hours: u32,
    ) -> Self {
        Self {
            origin,
            wind: WindState::new(wind.speed_kmh, wind.direction_deg),
            vegetation: VegetationState::new(vegetation.vegetation_type, vegetation.moisture_pct),
            cause,
            detected_at,
            issued_at: None,
            horizon_hours,
            weights: BlendWeights::default(),
            terrain: None,
            inhibitors: Inhibitors::default(),
        }
    }

    pub fn with_weights(mut self, weights: BlendWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_terrain(mut self, terrain: Terrain) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn with_inhibitors(mut self, inhibitors: Inhibitors) -> Self {
        self.inhibitors = inhibitors;
        self
    }

    pub fn with_issue_time(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    fn issue_time(&self) -> DateTime<Utc> {
        self.issued_at.unwrap_or(self.detected_at)
    }

    fn model_features(&self) -> SpreadFeatures {
        let elapsed = self.issue_time() - self.detected_at;
        SpreadFeatures {
            latitude: self.origin.latitude,
            longitude: self.origin.longitude,
            vegetation: self.vegetation.vegetation_type,
            wind_speed_kmh: self.wind.speed_kmh,
            wind_direction_deg: self.wind.direction_deg,
            moisture_pct: self.vegetation.moisture_pct,
            cause: self.cause,
            elapsed_hours: elapsed.num_milliseconds() as f64 / 3_600_000.0,
            terrain: self.terrain,
            inhibitors: self.inhibitors,
        }
    }
}

/// Spread projector holding an optional injected rate model.
#[derive(Clone, Default)]
pub struct SpreadProjector {
    model: Option<Arc<dyn SpreadRateModel>>,
}

impl fmt::Debug for SpreadProjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpreadProjector")
            .field("has_model", &self.model.is_some())
            .finish()
    }
}

impl SpreadProjector {
    pub fn new(model: Option<Arc<dyn SpreadRateModel>>) -> Self {
        Self { model }
    }

    pub fn physics_only() -> Self {
        Self { model: None }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn project(&self, request: &ForecastRequest) -> Result<SpreadForecast> {
        project(request, self.model.as_deref())
    }
}

/// Physics rate for a request, terrain-adjusted when terrain is known.
pub fn physics_rate(request: &ForecastRequest) -> f64 {
    let rate = spread_rate(
        request.vegetation.vegetation_type,
        request.wind.speed_kmh,
        request.vegetation.moisture_pct,
        request.cause,
    );
    match &request.terrain {
        Some(terrain) => adjust_for_terrain(rate, terrain),
        None => rate,
    }
}

/// Per-step confidence, clamped to [`confidence::BOUNDS`].
pub fn step_confidence(
    hour: u32,
    wind_speed_kmh: f64,
    moisture_pct: f64,
    cause_factor: f64,
) -> f64 {
    let raw = confidence::INITIAL
        - confidence::DECAY_PER_HOUR * f64::from(hour)
        - confidence::WIND_PENALTY * wind_speed_kmh / 10.0
        - confidence::MOISTURE_PENALTY * moisture_pct / 50.0
        - confidence::CAUSE_PENALTY * (cause_factor - 1.0);
    raw.clamp(*confidence::BOUNDS.start(), *confidence::BOUNDS.end())
}

/// Project a forecast trajectory.
///
/// Blend weights and horizon are validated and surfaced as configuration
/// errors; the origin must be a valid coordinate. A missing model, a model
/// error or an unusable model output falls back to the physics rate.
pub fn project(
    request: &ForecastRequest,
    model: Option<&dyn SpreadRateModel>,
) -> Result<SpreadForecast> {
    request.weights.validate()?;
    validate_horizon(request.horizon_hours)?;
    let origin = GeoPoint::validated(
        request.origin.latitude,
        request.origin.longitude,
        "forecast origin",
    )?;

    let physics = physics_rate(request);
    let ml = model.and_then(|model| match model.predict_rate(&request.model_features()) {
        Ok(rate) if rate.is_finite() && rate >= 0.0 => Some(rate),
        Ok(rate) => {
            warn!(rate, "spread model returned an unusable rate, using physics only");
            None
        }
        Err(err) => {
            warn!(error = %err, "spread model failed, using physics only");
            None
        }
    });

    let combined =
        request.weights.physics * physics + request.weights.ml * ml.unwrap_or(physics);
    let risk_level = RiskLevel::from_rate(combined);
    let cause_factor = request.cause.multiplier();
    let bearing = request.wind.direction_deg;
    let issued_at = request.issue_time();

    let predictions = (1..=request.horizon_hours)
        .map(|hour| {
            let distance = combined * f64::from(hour);
            let head = HEAD_RATIO * distance;
            let flank = FLANK_RATIO * distance;
            let head_point = origin.offset_flat(head, bearing);
            SpreadStepPrediction {
                hour,
                timestamp: issued_at + Duration::hours(i64::from(hour)),
                predicted_head_lat: head_point.latitude,
                predicted_head_lon: head_point.longitude,
                estimated_area_ha: std::f64::consts::PI * head * flank * HECTARES_PER_KM2,
                confidence: step_confidence(
                    hour,
                    request.wind.speed_kmh,
                    request.vegetation.moisture_pct,
                    cause_factor,
                ),
            }
        })
        .collect();

    debug!(
        physics,
        ml = ?ml,
        combined,
        risk = %risk_level,
        horizon = request.horizon_hours,
        "spread forecast projected"
    );

    Ok(SpreadForecast {
        origin,
        spread_rate_kmh: combined,
        physics_rate_kmh: physics,
        ml_rate_kmh: ml,
        dominant_direction_deg: bearing,
        risk_level,
        issued_at,
        predictions,
    })
}

//! Fire spread forecasting
//!
//! [`physics`] holds the closed-form rate model and [`terrain`] its slope and
//! elevation refinement. [`projector`] blends that rate with an optional
//! learned [`SpreadRateModel`] and produces an hourly [`SpreadForecast`].

pub mod model;
pub mod physics;
pub mod projector;
pub mod terrain;

pub use model::{
    Inhibitors, LinearSpreadModel, NumericCoefficients, SpreadFeatures, SpreadRateModel,
};
pub use physics::{
    base_spread_rate, moisture_factor, spread_rate, wind_factor, SpreadCause, VegetationType,
};
pub use projector::{
    physics_rate, project, step_confidence, ForecastRequest, RiskLevel, SpreadForecast,
    SpreadProjector, SpreadStepPrediction, VegetationState, WindState,
};
pub use terrain::{adjust_for_terrain, Terrain};

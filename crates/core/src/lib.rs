//! Wildfire Analysis Core Library
//!
//! Turns heterogeneous wildfire signals (satellite hotspots, official
//! reports, weather, ground sensors, vegetation) into three escalating
//! outputs:
//!
//! 1. a fire/no-fire call from a deterministic multi-source vote,
//! 2. a probable ignition cause from spatial-temporal feature enrichment and
//!    an explainable classifier,
//! 3. an hourly spread forecast blending an empirical rate with an optional
//!    learned rate.
//!
//! ## Shared state
//!
//! Reference layers and loaded model artifacts are read-only and shared via
//! `Arc`; every other value is created per request. No stage performs I/O
//! beyond the explicit artifact `load` helpers.

// Core types and utilities
pub mod config;
pub mod core_types;
pub mod error;

// Analysis stages
pub mod attribution;
pub mod detection;
pub mod pipeline;
pub mod spread;

// Re-export core types
pub use config::{BlendWeights, PipelineConfig};
pub use core_types::{GeoPoint, SignalBundle};
pub use error::{EcoFlareError, Result};

// Re-export stage entry points
pub use attribution::{
    AttributionClassifier, AttributionFeatureRecord, CauseLabel, CausePrediction, FeatureEnricher,
    FireObservation, ForestModel, ReferenceLayers,
};
pub use detection::{vote, DetectionVerdict};
pub use pipeline::{CycleReport, Pipeline, SpreadInputs};
pub use spread::{project, spread_rate, LinearSpreadModel, SpreadForecast, SpreadProjector};

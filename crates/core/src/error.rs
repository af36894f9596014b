//! Error taxonomy for the analysis pipeline
//!
//! Only geometry, configuration and artifact problems are ever returned to a
//! caller. Missing signals, missing models and explainer failures degrade to
//! a fallback path inside the stage that observed them and are reported
//! through `tracing` instead.

use thiserror::Error;

/// Errors surfaced by the analysis pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EcoFlareError {
    /// Malformed coordinates in an observation or reference layer.
    ///
    /// Raised before any spatial join so it is never confused with a join
    /// that simply found no candidate.
    #[error("invalid geometry in {context}: latitude {latitude}, longitude {longitude}")]
    InvalidGeometry {
        /// Where the bad point came from (`"observation"`, `"lightning layer"`, ...)
        context: String,
        latitude: f64,
        longitude: f64,
    },

    /// Caller contract violation: blend weights, forecast horizon, or a
    /// class index outside the label set in strict mode.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A model artifact is missing or cannot score the given input.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Attribution weights could not be computed for a prediction.
    #[error("explanation failed: {0}")]
    Explainability(String),

    /// A model or scenario document could not be read or parsed.
    #[error("artifact error: {0}")]
    Artifact(String),
}

impl EcoFlareError {
    /// Create an invalid-geometry error for a point.
    pub fn invalid_geometry(context: &str, latitude: f64, longitude: f64) -> Self {
        Self::InvalidGeometry {
            context: context.to_string(),
            latitude,
            longitude,
        }
    }

    /// Create a configuration error with a formatted message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<serde_json::Error> for EcoFlareError {
    fn from(err: serde_json::Error) -> Self {
        Self::Artifact(err.to_string())
    }
}

impl From<std::io::Error> for EcoFlareError {
    fn from(err: std::io::Error) -> Self {
        Self::Artifact(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EcoFlareError>;

//! Detection → attribution → forecast orchestration
//!
//! A [`Pipeline`] owns the shared read-only state (reference layers and
//! loaded models) and runs one detection cycle at a time. Attribution and
//! forecasting only run when the vote detects a fire; cycles share nothing
//! mutable, so a caller may run several concurrently or drop one under load.

use crate::attribution::{
    AttributionClassifier, AttributionFeatureRecord, CausePrediction, FeatureEnricher,
    FireObservation, JoinDistances, LiveContext, ReferenceLayers,
};
use crate::config::{BlendWeights, PipelineConfig};
use crate::core_types::SignalBundle;
use crate::detection::{self, cluster_area_ha, DetectionVerdict, OverallRisk};
use crate::error::Result;
use crate::spread::{
    ForecastRequest, Inhibitors, SpreadCause, SpreadForecast, SpreadProjector,
    SpreadRateModel, Terrain, VegetationState, WindState,
};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span};

/// Caller-supplied inputs for the spread stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadInputs {
    pub wind: WindState,
    pub vegetation: VegetationState,
    #[serde(default)]
    pub terrain: Option<Terrain>,
    #[serde(default)]
    pub inhibitors: Inhibitors,
    /// Overrides the configured horizon
    #[serde(default)]
    pub horizon_hours: Option<u32>,
    /// Overrides the configured blend weights
    #[serde(default)]
    pub weights: Option<BlendWeights>,
    /// Forecast issue time; the detection time when absent
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
}

impl SpreadInputs {
    pub fn new(wind: WindState, vegetation: VegetationState) -> Self {
        Self {
            wind,
            vegetation,
            terrain: None,
            inhibitors: Inhibitors::default(),
            horizon_hours: None,
            weights: None,
            issued_at: None,
        }
    }
}

/// Attribution result for one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub observation: FireObservation,
    pub features: AttributionFeatureRecord,
    pub distances: JoinDistances,
    pub prediction: CausePrediction,
}

/// Everything produced by one detection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub verdict: DetectionVerdict,
    pub overall_risk: OverallRisk,
    /// Convex-hull area of the satellite hotspots, when rows were reported
    pub hotspot_area_ha: Option<f64>,
    pub attribution: Option<Attribution>,
    pub forecast: Option<SpreadForecast>,
}

/// Analysis pipeline with injected reference layers and models.
#[derive(Debug, Clone)]
pub struct Pipeline {
    enricher: FeatureEnricher,
    classifier: AttributionClassifier,
    projector: SpreadProjector,
    config: PipelineConfig,
}

impl Pipeline {
    /// Assemble a pipeline; the configuration is validated up front.
    pub fn new(
        layers: Arc<ReferenceLayers>,
        classifier: AttributionClassifier,
        spread_model: Option<Arc<dyn SpreadRateModel>>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            lightning = layers.lightning.len(),
            population = layers.population.len(),
            infrastructure = layers.infrastructure.len(),
            cause_model = classifier.has_model(),
            spread_model = spread_model.is_some(),
            "pipeline ready"
        );
        Ok(Self {
            enricher: FeatureEnricher::new(layers, &config.enrichment),
            classifier,
            projector: SpreadProjector::new(spread_model),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &AttributionClassifier {
        &self.classifier
    }

    pub fn projector(&self) -> &SpreadProjector {
        &self.projector
    }

    /// Run one detection cycle for `observation`.
    ///
    /// Without a detected fire the report carries only the verdict and
    /// risk. The forecast also needs `spread` inputs.
    pub fn run_cycle(
        &self,
        signals: &SignalBundle,
        observation: &FireObservation,
        spread: Option<&SpreadInputs>,
    ) -> Result<CycleReport> {
        let span = info_span!("cycle", lat = observation.latitude, lon = observation.longitude);
        let _guard = span.enter();

        let verdict = detection::vote(signals, observation.timestamp);
        let overall_risk = OverallRisk::assess(
            signals.weather.as_ref(),
            verdict.vegetation_risk,
            verdict.sensor_risk,
        );
        let hotspot_area_ha = signals
            .satellite
            .as_ref()
            .filter(|report| !report.rows.is_empty())
            .map(cluster_area_ha);

        if !verdict.fire_detected {
            info!(votes = verdict.votes, total = verdict.total_votes, "no fire detected");
            return Ok(CycleReport {
                verdict,
                overall_risk,
                hotspot_area_ha,
                attribution: None,
                forecast: None,
            });
        }

        let context = LiveContext {
            weather: signals.weather.as_ref(),
            sensor: signals.sensor.as_ref(),
            vegetation: signals.vegetation.as_ref(),
        };
        let attribution = self.attribute(observation, &context)?;
        let cause = SpreadCause::from(attribution.prediction.predicted_cause);

        let forecast = spread
            .map(|inputs| self.forecast(observation, cause, inputs))
            .transpose()?;

        info!(
            votes = verdict.votes,
            cause = %attribution.prediction.predicted_cause,
            confidence = attribution.prediction.confidence,
            risk = ?forecast.as_ref().map(|f| f.risk_level),
            "fire cycle complete"
        );

        Ok(CycleReport {
            verdict,
            overall_risk,
            hotspot_area_ha,
            attribution: Some(attribution),
            forecast,
        })
    }

    /// Enrich and classify a single observation.
    pub fn attribute(
        &self,
        observation: &FireObservation,
        context: &LiveContext<'_>,
    ) -> Result<Attribution> {
        let (features, distances) = self.enricher.enrich_with_distances(observation, context)?;
        let prediction = self.classifier.classify(&features)?;
        Ok(Attribution {
            observation: *observation,
            features,
            distances,
            prediction,
        })
    }

    /// Attribute many observations in parallel against the same context.
    ///
    /// Results keep input order; one bad observation does not affect the
    /// others.
    pub fn attribute_batch(
        &self,
        observations: &[FireObservation],
        context: &LiveContext<'_>,
    ) -> Vec<Result<Attribution>> {
        observations
            .par_iter()
            .map(|observation| self.attribute(observation, context))
            .collect()
    }

    /// Project spread from `observation` for an already attributed cause.
    pub fn forecast(
        &self,
        observation: &FireObservation,
        cause: SpreadCause,
        inputs: &SpreadInputs,
    ) -> Result<SpreadForecast> {
        let defaults = &self.config.forecast;
        let mut request = ForecastRequest::new(
            observation.location(),
            inputs.wind,
            inputs.vegetation,
            cause,
            observation.timestamp,
            inputs.horizon_hours.unwrap_or(defaults.horizon_hours),
        )
        .with_weights(inputs.weights.unwrap_or_else(|| defaults.weights()))
        .with_inhibitors(inputs.inhibitors);
        if let Some(terrain) = inputs.terrain {
            request = request.with_terrain(terrain);
        }
        if let Some(issued_at) = inputs.issued_at {
            request = request.with_issue_time(issued_at);
        }
        self.projector.project(&request)
    }
}

//! Ignition cause classifier
//!
//! Two-phase lifecycle: [`AttributionClassifier::load`] takes an injected
//! model handle and probes once whether it can explain its predictions;
//! [`AttributionClassifier::classify`] then scores records without further
//! setup. Without a usable model the classifier answers from the rule set
//! in [`super::rules`].

use super::features::{AttributionFeatureRecord, Feature};
use super::model::CauseModel;
use super::rules;
use super::training::{self, TrainingConfig};
use crate::config::ClassifierConfig;
use crate::error::{EcoFlareError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Probable ignition cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CauseLabel {
    Lightning,
    HumanActivity,
    EquipmentFailure,
    SpontaneousCombustion,
}

impl CauseLabel {
    /// Labels in class-index order.
    pub const ALL: [CauseLabel; 4] = [
        CauseLabel::Lightning,
        CauseLabel::HumanActivity,
        CauseLabel::EquipmentFailure,
        CauseLabel::SpontaneousCombustion,
    ];

    /// Map a model class index onto a label, wrapping indices past the end.
    pub fn from_class_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Map a model class index onto a label, rejecting indices past the end.
    pub fn try_from_class_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            EcoFlareError::configuration(format!(
                "class index {index} outside the {} cause labels",
                Self::ALL.len()
            ))
        })
    }

    /// Position of this label in [`CauseLabel::ALL`].
    pub fn class_index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CauseLabel::Lightning => "Lightning",
            CauseLabel::HumanActivity => "Human Activity",
            CauseLabel::EquipmentFailure => "Equipment Failure",
            CauseLabel::SpontaneousCombustion => "Spontaneous Combustion",
        }
    }
}

impl fmt::Display for CauseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Model,
    Rules,
}

/// Classifier output for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausePrediction {
    pub predicted_cause: CauseLabel,
    /// Class index reported by the model (label position for rules)
    pub class_index: usize,
    /// Maximum class probability, in [0, 1]
    pub confidence: f64,
    /// Signed contribution of each feature to the predicted class
    pub attribution_weights: Option<BTreeMap<Feature, f64>>,
    pub source: PredictionSource,
}

/// Cause classifier over an optional injected model.
#[derive(Clone)]
pub struct AttributionClassifier {
    model: Option<Arc<dyn CauseModel>>,
    explain: bool,
    strict_class_labels: bool,
}

impl fmt::Debug for AttributionClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributionClassifier")
            .field("has_model", &self.model.is_some())
            .field("explain", &self.explain)
            .field("strict_class_labels", &self.strict_class_labels)
            .finish()
    }
}

impl AttributionClassifier {
    /// Load a model, probing its explanation capability once.
    ///
    /// Fails with [`EcoFlareError::ModelUnavailable`] when the model fails
    /// its structural check, was trained on a different feature set, or has
    /// no classes.
    pub fn load(model: Arc<dyn CauseModel>, config: &ClassifierConfig) -> Result<Self> {
        model.verify().map_err(|err| {
            EcoFlareError::ModelUnavailable(format!("cause model failed verification: {err}"))
        })?;
        if model.n_features() != Feature::COUNT {
            return Err(EcoFlareError::ModelUnavailable(format!(
                "cause model expects {} features, records carry {}",
                model.n_features(),
                Feature::COUNT
            )));
        }
        if model.class_labels().is_empty() {
            return Err(EcoFlareError::ModelUnavailable(
                "cause model has no classes".into(),
            ));
        }

        let explain = config.explain && model.supports_explanation();
        if config.explain && !explain {
            warn!("cause model cannot explain predictions; attribution weights disabled");
        }
        info!(
            classes = model.class_labels().len(),
            explain, "cause model loaded"
        );

        Ok(Self {
            model: Some(model),
            explain,
            strict_class_labels: config.strict_class_labels,
        })
    }

    /// Classifier that always answers from the rule set.
    pub fn rules_only(config: &ClassifierConfig) -> Self {
        Self {
            model: None,
            explain: false,
            strict_class_labels: config.strict_class_labels,
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Whether predictions carry attribution weights.
    pub fn explains(&self) -> bool {
        self.explain
    }

    /// Predict the ignition cause of one record.
    ///
    /// Only a strict-mode class index outside the label set is an error;
    /// model failures fall back to rules and explainer failures drop the
    /// weights.
    pub fn classify(&self, record: &AttributionFeatureRecord) -> Result<CausePrediction> {
        let Some(model) = &self.model else {
            return Ok(rule_prediction(record));
        };

        let features = record.to_vector();
        let (column, confidence) = match model.predict_proba(&features).and_then(argmax) {
            Ok(best) => best,
            Err(err) => {
                warn!(error = %err, "cause model failed, using rule attribution");
                return Ok(rule_prediction(record));
            }
        };

        let Some(&class_value) = model.class_labels().get(column) else {
            warn!(column, "probability column has no class label, using rule attribution");
            return Ok(rule_prediction(record));
        };
        let class_index = class_value as usize;

        let predicted_cause = if self.strict_class_labels {
            CauseLabel::try_from_class_index(class_index)?
        } else {
            if class_index >= CauseLabel::ALL.len() {
                warn!(class_index, "class index outside cause labels, wrapping");
            }
            CauseLabel::from_class_index(class_index)
        };

        let attribution_weights = if self.explain {
            match model.explain(&features, column) {
                Ok(contributions) => Some(
                    Feature::ALL
                        .into_iter()
                        .zip(contributions)
                        .collect::<BTreeMap<_, _>>(),
                ),
                Err(err) => {
                    warn!(error = %err, "attribution weights unavailable");
                    None
                }
            }
        } else {
            None
        };

        Ok(CausePrediction {
            predicted_cause,
            class_index,
            confidence: confidence.clamp(0.0, 1.0),
            attribution_weights,
            source: PredictionSource::Model,
        })
    }

    /// Classify many records in parallel, preserving order.
    pub fn classify_batch(
        &self,
        records: &[AttributionFeatureRecord],
    ) -> Result<Vec<CausePrediction>> {
        records.par_iter().map(|r| self.classify(r)).collect()
    }

    /// Administrative refit: train a new forest on `(x, y)` and load it
    /// with this classifier's settings, rebuilding the explainer.
    ///
    /// Never called on the scoring path.
    pub fn retrain(
        &self,
        x: &[[f64; Feature::COUNT]],
        y: &[u32],
        training: &TrainingConfig,
    ) -> Result<Self> {
        let rows: Vec<Vec<f64>> = x.iter().map(|row| row.to_vec()).collect();
        let names = Feature::ALL.iter().map(|f| f.name().to_string()).collect();
        let model = training::train(&rows, y, names, training)?;
        let config = ClassifierConfig {
            strict_class_labels: self.strict_class_labels,
            explain: true,
        };
        Self::load(Arc::new(model), &config)
    }
}

/// Column and value of the largest probability; first column wins ties.
fn argmax(proba: Vec<f64>) -> Result<(usize, f64)> {
    if proba.iter().any(|p| !p.is_finite()) {
        return Err(EcoFlareError::ModelUnavailable(
            "model returned non-finite probabilities".into(),
        ));
    }
    proba
        .into_iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
        .ok_or_else(|| EcoFlareError::ModelUnavailable("model returned no probabilities".into()))
}

fn rule_prediction(record: &AttributionFeatureRecord) -> CausePrediction {
    let (predicted_cause, confidence) = rules::attribute(record);
    CausePrediction {
        predicted_cause,
        class_index: predicted_cause.class_index(),
        confidence,
        attribution_weights: None,
        source: PredictionSource::Rules,
    }
}

//! Ignition cause attribution
//!
//! A detected fire is joined against static reference layers (lightning,
//! population, infrastructure) and the live readings of its cycle to build
//! a fixed-schema [`AttributionFeatureRecord`], which a loaded
//! [`CauseModel`] (or the rule set, when none is loaded) turns into a
//! [`CausePrediction`].

pub mod classifier;
pub mod enrich;
pub mod features;
pub mod forest;
pub mod layers;
pub mod model;
pub mod rules;
pub mod training;

pub use classifier::{AttributionClassifier, CauseLabel, CausePrediction, PredictionSource};
pub use enrich::{enrich, FeatureEnricher, FireObservation, JoinDistances, LiveContext};
pub use features::{AttributionFeatureRecord, Feature, UNKNOWN};
pub use forest::{DecisionTree, ForestModel, Node};
pub use layers::{
    InfrastructurePoint, LightningStrike, Located, PopulationPoint, ReferenceLayer,
    ReferenceLayerSpec, ReferenceLayers,
};
pub use model::CauseModel;
pub use training::{train, TrainingConfig};

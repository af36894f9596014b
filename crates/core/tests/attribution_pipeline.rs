//! Enrichment and classification against a loaded forest artifact
use approx::assert_relative_eq;
use chrono::{Duration, TimeZone, Utc};
use ecoflare_core::attribution::{
    AttributionClassifier, AttributionFeatureRecord, CauseLabel, CauseModel, DecisionTree,
    Feature, FeatureEnricher, FireObservation, ForestModel, InfrastructurePoint, LightningStrike,
    LiveContext, Node, PopulationPoint, PredictionSource, ReferenceLayerSpec, ReferenceLayers,
    TrainingConfig,
};
use ecoflare_core::config::{ClassifierConfig, EnrichmentConfig};
use ecoflare_core::EcoFlareError;
use std::sync::Arc;

fn feature_names() -> Vec<String> {
    Feature::ALL.iter().map(|f| f.name().to_string()).collect()
}

/// One tree on `lightning_recent` (NaN → left) and one on `pop_density`
/// (NaN → right), with class distributions on every node.
fn cause_forest(class_labels: Vec<u32>) -> ForestModel {
    let lightning = DecisionTree {
        nodes: vec![
            Node::Split {
                feature: Feature::LightningRecent.column(),
                threshold: 0.5,
                left: 1,
                right: 2,
                missing_left: true,
                value: vec![0.4, 0.4, 0.1, 0.1],
            },
            Node::Leaf {
                value: vec![0.1, 0.6, 0.2, 0.1],
            },
            Node::Leaf {
                value: vec![0.85, 0.05, 0.05, 0.05],
            },
        ],
    };
    let population = DecisionTree {
        nodes: vec![
            Node::Split {
                feature: Feature::PopDensity.column(),
                threshold: 100.0,
                left: 1,
                right: 2,
                missing_left: false,
                value: vec![0.3, 0.4, 0.2, 0.1],
            },
            Node::Leaf {
                value: vec![0.4, 0.2, 0.2, 0.2],
            },
            Node::Leaf {
                value: vec![0.1, 0.7, 0.1, 0.1],
            },
        ],
    };
    ForestModel {
        feature_names: feature_names(),
        class_labels,
        trees: vec![lightning, population],
    }
}

fn classifier(config: &ClassifierConfig) -> AttributionClassifier {
    let model = cause_forest(vec![0, 1, 2, 3]);
    model.validate().unwrap();
    AttributionClassifier::load(Arc::new(model), config).unwrap()
}

fn observed_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 12, 21, 15, 0).unwrap()
}

fn layers() -> Arc<ReferenceLayers> {
    let spec = ReferenceLayerSpec {
        lightning: vec![LightningStrike {
            latitude: 49.30,
            longitude: -123.10,
            strike_time: observed_at() - Duration::hours(3),
        }],
        population: vec![
            PopulationPoint {
                latitude: 49.31,
                longitude: -123.10,
                population: 40.0,
            },
            PopulationPoint {
                latitude: 49.80,
                longitude: -123.50,
                population: 2500.0,
            },
        ],
        infrastructure: vec![InfrastructurePoint {
            latitude: 49.40,
            longitude: -123.10,
            kind: Some("power_line".into()),
        }],
        utc_offset_hours: -7.0,
    };
    Arc::new(ReferenceLayers::build(spec, 5.0).unwrap())
}

#[test]
fn test_enrich_then_classify_with_explanation() {
    let enricher = FeatureEnricher::new(layers(), &EnrichmentConfig::default());
    let observation = FireObservation::new(49.30, -123.10, observed_at());
    let record = enricher
        .enrich(&observation, &LiveContext::default())
        .unwrap();

    assert_eq!(record.lightning_recent, 1.0);
    assert_eq!(record.pop_density, 40.0);
    // ~11.1 km to the power line
    assert!(record.infra_density > 0.07 && record.infra_density < 0.1);
    // 21:15 UTC → 14:15 local, Saturday
    assert_eq!(record.hour, 14.0);
    assert_eq!(record.day_of_week, 5.0);

    let classifier = classifier(&ClassifierConfig::default());
    assert!(classifier.explains());
    let prediction = classifier.classify(&record).unwrap();

    assert_eq!(prediction.predicted_cause, CauseLabel::Lightning);
    assert_eq!(prediction.source, PredictionSource::Model);
    // (0.85 + 0.4) / 2
    assert_relative_eq!(prediction.confidence, 0.625, epsilon = 1e-12);

    let weights = prediction.attribution_weights.expect("explained");
    assert_eq!(weights.len(), Feature::COUNT);
    let model = cause_forest(vec![0, 1, 2, 3]);
    let total = model.expected_value(0) + weights.values().sum::<f64>();
    assert_relative_eq!(total, prediction.confidence, epsilon = 1e-12);
    assert!(weights[&Feature::LightningRecent] > 0.0);
    assert_eq!(weights[&Feature::Hour], 0.0);
}

#[test]
fn test_unknown_sentinel_is_deterministic() {
    let classifier = classifier(&ClassifierConfig::default());
    let record = AttributionFeatureRecord::unknown();
    let first = classifier.classify(&record).unwrap();
    for _ in 0..5 {
        assert_eq!(classifier.classify(&record).unwrap(), first);
    }
    // NaN lightning → left [0.1, 0.6, ...]; NaN population → right [0.1, 0.7, ...]
    assert_eq!(first.predicted_cause, CauseLabel::HumanActivity);
    assert_relative_eq!(first.confidence, 0.65, epsilon = 1e-12);
}

#[test]
fn test_out_of_range_class_labels_wrap_by_default() {
    let model = cause_forest(vec![4, 5, 6, 7]);
    let classifier =
        AttributionClassifier::load(Arc::new(model), &ClassifierConfig::default()).unwrap();
    let record = AttributionFeatureRecord {
        lightning_recent: 1.0,
        ..AttributionFeatureRecord::unknown()
    };
    let prediction = classifier.classify(&record).unwrap();
    assert_eq!(prediction.class_index, 4);
    assert_eq!(prediction.predicted_cause, CauseLabel::Lightning);

    for index in 0..64 {
        assert!(CauseLabel::ALL.contains(&CauseLabel::from_class_index(index)));
        assert_eq!(CauseLabel::from_class_index(index), CauseLabel::ALL[index % 4]);
    }
}

#[test]
fn test_out_of_range_class_labels_rejected_in_strict_mode() {
    let strict = ClassifierConfig {
        strict_class_labels: true,
        ..ClassifierConfig::default()
    };
    let model = cause_forest(vec![4, 5, 6, 7]);
    let classifier = AttributionClassifier::load(Arc::new(model), &strict).unwrap();
    let err = classifier
        .classify(&AttributionFeatureRecord::unknown())
        .unwrap_err();
    assert!(matches!(err, EcoFlareError::Configuration(_)));
}

#[test]
fn test_leaf_only_artifact_scores_without_weights() {
    let mut model = cause_forest(vec![0, 1, 2, 3]);
    for tree in &mut model.trees {
        if let Node::Split { value, .. } = &mut tree.nodes[0] {
            value.clear();
        }
    }
    assert!(!model.supports_explanation());

    let classifier =
        AttributionClassifier::load(Arc::new(model), &ClassifierConfig::default()).unwrap();
    assert!(!classifier.explains());
    let prediction = classifier
        .classify(&AttributionFeatureRecord::unknown())
        .unwrap();
    assert!(prediction.attribution_weights.is_none());
    assert_eq!(prediction.source, PredictionSource::Model);
}

#[test]
fn test_artifact_round_trip_through_json() {
    let model = cause_forest(vec![0, 1, 2, 3]);
    let json = model.to_json_string().unwrap();
    let reloaded = ForestModel::from_json_str(&json).unwrap();
    let record = AttributionFeatureRecord {
        pop_density: 900.0,
        lightning_recent: 0.0,
        ..AttributionFeatureRecord::unknown()
    };
    let x = record.to_vector();
    assert_eq!(
        model.predict_proba(&x).unwrap(),
        reloaded.predict_proba(&x).unwrap()
    );
}

#[test]
fn test_wrong_feature_width_is_rejected_at_load() {
    let mut model = cause_forest(vec![0, 1, 2, 3]);
    model.feature_names.pop();
    let result = AttributionClassifier::load(Arc::new(model), &ClassifierConfig::default());
    assert!(matches!(result, Err(EcoFlareError::ModelUnavailable(_))));
}

#[test]
fn test_structurally_broken_forest_is_rejected_at_load() {
    let mut model = cause_forest(vec![0, 1, 2, 3]);
    if let Node::Split { right, .. } = &mut model.trees[1].nodes[0] {
        *right = 40;
    }
    let result = AttributionClassifier::load(Arc::new(model), &ClassifierConfig::default());
    assert!(matches!(result, Err(EcoFlareError::ModelUnavailable(_))));
}

#[test]
fn test_retrain_rebuilds_explaining_classifier() {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in 0..60 {
        let mut row = [0.0; Feature::COUNT];
        let lightning = i % 3 == 0;
        row[Feature::LightningRecent.column()] = if lightning { 1.0 } else { 0.0 };
        row[Feature::Hour.column()] = f64::from(i % 24);
        row[Feature::PopDensity.column()] = if lightning { 3.0 } else { 400.0 };
        x.push(row);
        y.push(if lightning { 0 } else { 1 });
    }

    let training = TrainingConfig {
        n_trees: 12,
        ..TrainingConfig::default()
    };
    let classifier = AttributionClassifier::rules_only(&ClassifierConfig::default())
        .retrain(&x, &y, &training)
        .unwrap();
    assert!(classifier.has_model());
    assert!(classifier.explains());

    let strike = AttributionFeatureRecord {
        lightning_recent: 1.0,
        pop_density: 3.0,
        hour: 4.0,
        ..AttributionFeatureRecord::unknown()
    };
    let prediction = classifier.classify(&strike).unwrap();
    assert_eq!(prediction.predicted_cause, CauseLabel::Lightning);
    assert!(prediction.confidence > 0.8);
    assert!(prediction.attribution_weights.is_some());
}

#[test]
fn test_batch_matches_single_classification() {
    let classifier = classifier(&ClassifierConfig::default());
    let records: Vec<AttributionFeatureRecord> = (0..32)
        .map(|i| AttributionFeatureRecord {
            lightning_recent: f64::from(i % 2),
            pop_density: f64::from(i) * 20.0,
            ..AttributionFeatureRecord::unknown()
        })
        .collect();
    let batch = classifier.classify_batch(&records).unwrap();
    for (record, prediction) in records.iter().zip(&batch) {
        assert_eq!(&classifier.classify(record).unwrap(), prediction);
    }
}

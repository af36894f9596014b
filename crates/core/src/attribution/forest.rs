//! Decision-tree ensemble artifact
//!
//! A random forest serialized as JSON: per-tree flat node arrays where every
//! node carries the class distribution of the training samples that reached
//! it. Scoring averages leaf distributions across trees.
//!
//! # Explanation
//!
//! Feature contributions use path attribution (Saabas): walking a sample
//! down a tree, each split credits its feature with the change in the
//! target class probability between parent and child. Averaged over trees,
//!
//! ```text
//! p(class | x) = bias(class) + Σ_f contribution_f(class, x)
//! ```
//!
//! where `bias` is the mean root distribution. This needs a distribution on
//! every internal node; artifacts that store leaf values only still score
//! but cannot explain.

use super::model::CauseModel;
use crate::error::{EcoFlareError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// NaN inputs follow the left child when true
        #[serde(default)]
        missing_left: bool,
        /// Class distribution at this node (may be empty in leaf-only artifacts)
        #[serde(default)]
        value: Vec<f64>,
    },
    Leaf {
        value: Vec<f64>,
    },
}

impl Node {
    fn value(&self) -> &[f64] {
        match self {
            Node::Split { value, .. } | Node::Leaf { value } => value,
        }
    }
}

/// A single decision tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Node indices from the root to the leaf reached by `features`.
    ///
    /// Out-of-range node or feature indices and backward child links are
    /// errors, so an unvalidated tree cannot panic or loop.
    fn descend(&self, features: &[f64]) -> Result<Vec<usize>> {
        let mut path = vec![0];
        let mut current = 0;
        loop {
            let node = self.nodes.get(current).ok_or_else(|| {
                EcoFlareError::ModelUnavailable(format!("tree has no node {current}"))
            })?;
            let Node::Split {
                feature,
                threshold,
                left,
                right,
                missing_left,
                ..
            } = node
            else {
                return Ok(path);
            };
            let x = *features.get(*feature).ok_or_else(|| {
                EcoFlareError::ModelUnavailable(format!("split on missing feature {feature}"))
            })?;
            let next = if x.is_nan() {
                if *missing_left {
                    *left
                } else {
                    *right
                }
            } else if x <= *threshold {
                *left
            } else {
                *right
            };
            if next <= current {
                return Err(EcoFlareError::ModelUnavailable(format!(
                    "node {current} links back to node {next}"
                )));
            }
            current = next;
            path.push(current);
        }
    }
}

/// Random forest classifier artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub feature_names: Vec<String>,
    /// Training label of each distribution column
    pub class_labels: Vec<u32>,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    /// Parse and validate a JSON artifact.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Load and validate a JSON artifact from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serialize to JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Structural checks: non-empty, children after parents, feature
    /// indices in range, leaf distributions sized to the class count.
    pub fn validate(&self) -> Result<()> {
        let n_classes = self.class_labels.len();
        let n_features = self.feature_names.len();

        if n_classes == 0 {
            return Err(artifact("model has no classes"));
        }
        if self.trees.is_empty() {
            return Err(artifact("model has no trees"));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(artifact(format!("tree {t} has no nodes")));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= n_features {
                            return Err(artifact(format!(
                                "tree {t} node {i}: feature {feature} out of range"
                            )));
                        }
                        if threshold.is_nan() {
                            return Err(artifact(format!("tree {t} node {i}: NaN threshold")));
                        }
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(artifact(format!(
                                    "tree {t} node {i}: invalid child index {child}"
                                )));
                            }
                        }
                    }
                    Node::Leaf { value } => {
                        if value.len() != n_classes {
                            return Err(artifact(format!(
                                "tree {t} leaf {i}: {} values for {n_classes} classes",
                                value.len()
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn n_classes(&self) -> usize {
        self.class_labels.len()
    }

    fn check_input(&self, features: &[f64]) -> Result<()> {
        if features.len() == self.feature_names.len() {
            Ok(())
        } else {
            Err(EcoFlareError::ModelUnavailable(format!(
                "model expects {} features, got {}",
                self.feature_names.len(),
                features.len()
            )))
        }
    }
}

impl CauseModel for ForestModel {
    fn verify(&self) -> Result<()> {
        self.validate()
    }

    fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn class_labels(&self) -> &[u32] {
        &self.class_labels
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        self.check_input(features)?;

        let mut proba = vec![0.0; self.n_classes()];
        for tree in &self.trees {
            let path = tree.descend(features)?;
            let leaf = path
                .last()
                .and_then(|&index| tree.nodes.get(index))
                .map_or_else(Vec::new, |node| normalized(node.value()));
            for (p, v) in proba.iter_mut().zip(leaf) {
                *p += v;
            }
        }

        let n_trees = self.trees.len() as f64;
        for p in &mut proba {
            *p /= n_trees;
        }
        Ok(proba)
    }

    fn supports_explanation(&self) -> bool {
        let n_classes = self.n_classes();
        self.trees
            .iter()
            .flat_map(|tree| tree.nodes.iter())
            .all(|node| node.value().len() == n_classes)
    }

    fn explain(&self, features: &[f64], class_column: usize) -> Result<Vec<f64>> {
        self.check_input(features)?;
        if class_column >= self.n_classes() {
            return Err(EcoFlareError::Explainability(format!(
                "class column {class_column} out of range"
            )));
        }
        if !self.supports_explanation() {
            return Err(EcoFlareError::Explainability(
                "internal nodes carry no class distributions".into(),
            ));
        }

        let mut contributions = vec![0.0; self.n_features()];
        for tree in &self.trees {
            let path = tree.descend(features)?;
            for pair in path.windows(2) {
                let (parent, child) = (&tree.nodes[pair[0]], &tree.nodes[pair[1]]);
                let Node::Split { feature, .. } = parent else {
                    continue;
                };
                let delta = normalized(child.value())[class_column]
                    - normalized(parent.value())[class_column];
                contributions[*feature] += delta;
            }
        }

        let n_trees = self.trees.len() as f64;
        for c in &mut contributions {
            *c /= n_trees;
        }
        Ok(contributions)
    }
}

impl ForestModel {
    /// Mean root distribution for `class_column` (the explanation bias).
    pub fn expected_value(&self, class_column: usize) -> f64 {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| {
                tree.nodes
                    .first()
                    .map_or_else(Vec::new, |root| normalized(root.value()))
                    .get(class_column)
                    .copied()
                    .unwrap_or(0.0)
            })
            .sum();
        total / self.trees.len().max(1) as f64
    }
}

/// Distribution scaled to sum to one; all-zero stays all-zero.
fn normalized(value: &[f64]) -> Vec<f64> {
    let total: f64 = value.iter().sum();
    if total > 0.0 {
        value.iter().map(|v| v / total).collect()
    } else {
        value.to_vec()
    }
}

fn artifact(message: impl Into<String>) -> EcoFlareError {
    EcoFlareError::Artifact(message.into())
}

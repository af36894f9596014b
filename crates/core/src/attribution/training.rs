//! Offline forest training
//!
//! Administrative path only: the scoring pipeline never calls into this
//! module. Training runs in three steps:
//!
//! 1. **Oversampling**: minority classes are topped up to the majority
//!    count with synthetic rows interpolated between a sample and one of
//!    its k nearest same-class neighbours (SMOTE).
//! 2. **Bootstrap**: each tree sees a with-replacement resample.
//! 3. **CART**: Gini splits over a random √F feature subset per node.
//!    Rows with a NaN split feature go to the larger child, and that
//!    direction is stored on the node for scoring.
//!
//! Every random draw comes from a seeded `StdRng`, one stream per tree, so
//! training is reproducible regardless of thread scheduling.

use super::forest::{DecisionTree, ForestModel, Node};
use crate::error::{EcoFlareError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Forest hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features tried per split; `None` means √F
    pub max_features: Option<usize>,
    /// Balance classes with synthetic minority samples
    pub oversample: bool,
    /// Neighbours considered when interpolating synthetic samples
    pub smote_neighbors: usize,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_trees: 150,
            max_depth: 12,
            min_samples_split: 2,
            max_features: None,
            oversample: true,
            smote_neighbors: 5,
            seed: 42,
        }
    }
}

/// Fit a forest on `rows` (one feature vector per sample) and `labels`.
pub fn train(
    rows: &[Vec<f64>],
    labels: &[u32],
    feature_names: Vec<String>,
    config: &TrainingConfig,
) -> Result<ForestModel> {
    let n_features = feature_names.len();
    if rows.is_empty() {
        return Err(EcoFlareError::configuration("training set is empty"));
    }
    if rows.len() != labels.len() {
        return Err(EcoFlareError::configuration(format!(
            "{} rows but {} labels",
            rows.len(),
            labels.len()
        )));
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != n_features) {
        return Err(EcoFlareError::configuration(format!(
            "row {bad} has {} features, expected {n_features}",
            rows[bad].len()
        )));
    }
    if config.n_trees == 0 {
        return Err(EcoFlareError::configuration("n_trees must be positive"));
    }

    let mut class_labels: Vec<u32> = labels.to_vec();
    class_labels.sort_unstable();
    class_labels.dedup();

    let mut samples: Vec<Sample> = rows
        .iter()
        .zip(labels)
        .map(|(row, label)| Sample {
            features: row.clone(),
            class: class_labels.binary_search(label).unwrap_or_default(),
        })
        .collect();

    if config.oversample && class_labels.len() > 1 {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let synthetic = smote(&samples, class_labels.len(), config.smote_neighbors, &mut rng);
        info!(
            original = samples.len(),
            synthetic = synthetic.len(),
            "balanced training classes"
        );
        samples.extend(synthetic);
    }

    let max_features = config
        .max_features
        .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
        .clamp(1, n_features.max(1));

    let grower = TreeGrower {
        samples: &samples,
        n_classes: class_labels.len(),
        n_features,
        max_features,
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split.max(2),
    };

    let trees: Vec<DecisionTree> = (0..config.n_trees)
        .into_par_iter()
        .map(|t| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1 + t as u64));
            let bootstrap: Vec<usize> = (0..samples.len())
                .map(|_| rng.random_range(0..samples.len()))
                .collect();
            grower.grow(bootstrap, &mut rng)
        })
        .collect();

    info!(
        trees = trees.len(),
        samples = samples.len(),
        classes = class_labels.len(),
        "forest trained"
    );

    Ok(ForestModel {
        feature_names,
        class_labels,
        trees,
    })
}

#[derive(Debug, Clone)]
struct Sample {
    features: Vec<f64>,
    /// Column in the sorted class label list
    class: usize,
}

/// Synthetic minority samples bringing every class up to the majority count.
fn smote(samples: &[Sample], n_classes: usize, k: usize, rng: &mut StdRng) -> Vec<Sample> {
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, s) in samples.iter().enumerate() {
        by_class[s.class].push(i);
    }
    let target = by_class.iter().map(Vec::len).max().unwrap_or(0);

    let mut synthetic = Vec::new();
    for (class, members) in by_class.iter().enumerate() {
        if members.is_empty() || members.len() >= target {
            continue;
        }
        for _ in 0..(target - members.len()) {
            let base = &samples[members[rng.random_range(0..members.len())]];
            let neighbours = nearest_same_class(base, members, samples, k);
            let features = match neighbours.as_slice() {
                [] => base.features.clone(),
                list => {
                    let other = &samples[list[rng.random_range(0..list.len())]];
                    let gap: f64 = rng.random();
                    base.features
                        .iter()
                        .zip(&other.features)
                        .map(|(&a, &b)| {
                            if a.is_nan() || b.is_nan() {
                                a
                            } else {
                                a + gap * (b - a)
                            }
                        })
                        .collect()
                }
            };
            synthetic.push(Sample { features, class });
        }
    }
    synthetic
}

/// Up to `k` nearest members of the same class, excluding identical rows.
///
/// Distance ignores dimensions where either side is NaN.
fn nearest_same_class(
    base: &Sample,
    members: &[usize],
    samples: &[Sample],
    k: usize,
) -> Vec<usize> {
    let mut scored: Vec<(f64, usize)> = members
        .iter()
        .map(|&i| {
            let d: f64 = base
                .features
                .iter()
                .zip(&samples[i].features)
                .filter(|(a, b)| !a.is_nan() && !b.is_nan())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            (d, i)
        })
        .filter(|&(d, _)| d > 0.0)
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    scored.into_iter().take(k).map(|(_, i)| i).collect()
}

struct TreeGrower<'a> {
    samples: &'a [Sample],
    n_classes: usize,
    n_features: usize,
    max_features: usize,
    max_depth: usize,
    min_samples_split: usize,
}

/// Chosen split for a node.
struct SplitChoice {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
    missing_left: bool,
}

impl TreeGrower<'_> {
    fn grow(&self, rows: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        let mut nodes = Vec::new();
        self.grow_node(rows, 0, rng, &mut nodes);
        DecisionTree { nodes }
    }

    /// Append the subtree for `rows` in pre-order; returns its root index.
    fn grow_node(
        &self,
        rows: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
        nodes: &mut Vec<Node>,
    ) -> usize {
        let value = self.distribution(&rows);
        let index = nodes.len();
        nodes.push(Node::Leaf {
            value: value.clone(),
        });

        let pure = value.iter().filter(|&&v| v > 0.0).count() <= 1;
        if pure || depth >= self.max_depth || rows.len() < self.min_samples_split {
            return index;
        }

        let Some(split) = self.best_split(&rows, rng) else {
            return index;
        };

        let left = self.grow_node(split.left, depth + 1, rng, nodes);
        let right = self.grow_node(split.right, depth + 1, rng, nodes);
        nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            missing_left: split.missing_left,
            value,
        };
        index
    }

    /// Class fractions of `rows`.
    fn distribution(&self, rows: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &r in rows {
            counts[self.samples[r].class] += 1.0;
        }
        let total = rows.len().max(1) as f64;
        counts.iter().map(|c| c / total).collect()
    }

    fn best_split(&self, rows: &[usize], rng: &mut StdRng) -> Option<SplitChoice> {
        let mut candidates: Vec<usize> = (0..self.n_features).collect();
        candidates.shuffle(rng);

        let mut best: Option<(f64, usize, f64)> = None;
        let mut examined = 0;

        // Constant features do not use up the per-node feature budget
        for &feature in &candidates {
            if examined >= self.max_features {
                break;
            }
            let mut present: Vec<(f64, usize)> = rows
                .iter()
                .map(|&r| (self.samples[r].features[feature], self.samples[r].class))
                .filter(|(x, _)| !x.is_nan())
                .collect();
            present.sort_by(|a, b| a.0.total_cmp(&b.0));
            let varies = present.first().map(|f| f.0) != present.last().map(|l| l.0);
            if !varies {
                continue;
            }
            examined += 1;

            let mut right_counts = vec![0usize; self.n_classes];
            for &(_, c) in &present {
                right_counts[c] += 1;
            }
            let mut left_counts = vec![0usize; self.n_classes];
            let n = present.len();

            for i in 0..n - 1 {
                let class = present[i].1;
                left_counts[class] += 1;
                right_counts[class] -= 1;
                if present[i].0 == present[i + 1].0 {
                    continue;
                }
                let n_left = i + 1;
                let n_right = n - n_left;
                let impurity = (n_left as f64 * gini(&left_counts, n_left)
                    + n_right as f64 * gini(&right_counts, n_right))
                    / n as f64;
                let threshold = (present[i].0 + present[i + 1].0) / 2.0;
                if best.is_none_or(|(b, _, _)| impurity < b) {
                    best = Some((impurity, feature, threshold));
                }
            }
        }

        let (impurity, feature, threshold) = best?;
        let parent_counts = rows.iter().fold(vec![0usize; self.n_classes], |mut acc, &r| {
            acc[self.samples[r].class] += 1;
            acc
        });
        if impurity >= gini(&parent_counts, rows.len()) {
            return None;
        }

        let (mut left, mut right, mut missing) = (Vec::new(), Vec::new(), Vec::new());
        for &r in rows {
            let x = self.samples[r].features[feature];
            if x.is_nan() {
                missing.push(r);
            } else if x <= threshold {
                left.push(r);
            } else {
                right.push(r);
            }
        }

        let missing_left = left.len() >= right.len();
        if missing_left {
            left.extend(missing);
        } else {
            right.extend(missing);
        }

        Some(SplitChoice {
            feature,
            threshold,
            left,
            right,
            missing_left,
        })
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| (c as f64 / total).powi(2))
        .sum::<f64>()
}

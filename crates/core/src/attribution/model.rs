//! Scoring interface for trained cause models
//!
//! The classifier only sees this trait, so a loaded tree ensemble, an
//! external runtime wrapper, or a test stub can be injected interchangeably.

use crate::error::{EcoFlareError, Result};

/// A trained multi-class cause model.
pub trait CauseModel: Send + Sync {
    /// Structural self-check run once when a classifier loads the model.
    fn verify(&self) -> Result<()> {
        Ok(())
    }

    /// Number of input features the model was trained on.
    fn n_features(&self) -> usize;

    /// Class label (the training target value) of each probability column.
    fn class_labels(&self) -> &[u32];

    /// Class probabilities for one feature vector, in `class_labels` order.
    ///
    /// Unknown features arrive as NaN and must be handled deterministically.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;

    /// Whether [`explain`](Self::explain) can produce contributions.
    ///
    /// Probed once when a classifier loads the model.
    fn supports_explanation(&self) -> bool {
        false
    }

    /// Signed per-feature contributions to the probability of `class_column`.
    fn explain(&self, _features: &[f64], _class_column: usize) -> Result<Vec<f64>> {
        Err(EcoFlareError::Explainability(
            "model does not provide feature contributions".into(),
        ))
    }
}

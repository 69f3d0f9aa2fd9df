//! Core traits for the SVM inference core

use crate::core::{Prediction, Result};

/// Trained kernel classifier evaluated on raw feature vectors
pub trait SVMModel: Send + Sync {
    /// Decision value `b + Σ alpha_i k(sv_i, x)` for a single feature vector
    fn decision_function(&self, x: &[f64]) -> Result<f64>;

    /// Predict a single feature vector, labelling by sign
    fn predict(&self, x: &[f64]) -> Result<Prediction> {
        let decision_value = self.decision_function(x)?;
        Ok(Prediction::from_decision(decision_value, 0.0))
    }

    /// Get the number of support vectors
    fn n_support_vectors(&self) -> usize;

    /// Get the bias term
    fn bias(&self) -> f64;
}

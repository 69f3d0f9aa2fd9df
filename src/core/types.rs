//! Core type definitions for the SVM inference core

use crate::core::{Result, SVMError};
use serde::{Deserialize, Serialize};

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label (+1 or -1)
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: f64, decision_value: f64) -> Self {
        Self {
            label,
            decision_value,
        }
    }

    /// Map a decision value to a label: +1 at or above `threshold`, -1 below
    pub fn from_decision(decision_value: f64, threshold: f64) -> Self {
        let label = if decision_value >= threshold { 1.0 } else { -1.0 };
        Self::new(label, decision_value)
    }

    /// Get confidence as absolute value of decision value
    pub fn confidence(&self) -> f64 {
        self.decision_value.abs()
    }
}

/// Dense, row-major feature matrix with a fixed row width
///
/// Rows are positional feature vectors; the weighted-degree kernel reads them
/// as consecutive property blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseFeatures {
    data: Vec<f64>,
    dim: usize,
}

impl DenseFeatures {
    /// Wrap a flat row-major buffer
    ///
    /// Fails if `dim` is zero or the buffer length is not a multiple of `dim`.
    pub fn new(data: Vec<f64>, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(SVMError::InvalidParameter(
                "Feature dimension must be positive".to_string(),
            ));
        }
        if data.len() % dim != 0 {
            return Err(SVMError::DimensionMismatch {
                expected: dim,
                actual: data.len() % dim,
            });
        }
        Ok(Self { data, dim })
    }

    /// Build from individual rows, all of which must share one width
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let dim = rows.first().map(Vec::len).ok_or(SVMError::EmptyDataset)?;
        let mut data = Vec::with_capacity(dim * rows.len());
        for row in rows {
            if row.len() != dim {
                return Err(SVMError::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(data, dim)
    }

    /// Feature vector of example `i`
    ///
    /// # Panics
    /// Panics if `i >= len()`
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(
            i < self.len(),
            "Feature index {} out of bounds for {} examples",
            i,
            self.len()
        );
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Number of examples
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// Width of every feature vector
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.dim)
    }
}

/// Hyperparameters of the classifier
///
/// Only the toggles `batch_computation_enabled`, `linadd_enabled` and
/// `precomputed_subkernels_enabled` affect classification; the remaining
/// values are stored for the training procedure and round-trip through
/// persistence untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmParams {
    pub nu: f64,
    /// Regularization constant for positive examples
    pub c1: f64,
    /// Regularization constant for negative examples
    pub c2: f64,
    pub weight_epsilon: f64,
    pub epsilon: f64,
    pub tube_epsilon: f64,
    pub c_mkl: f64,
    /// QP subproblem size
    pub qpsize: usize,
    /// Training time limit in seconds (0 = unlimited)
    pub max_train_time: f64,
    pub shrinking_enabled: bool,
    pub mkl_enabled: bool,
    pub batch_computation_enabled: bool,
    pub linadd_enabled: bool,
    pub precomputed_subkernels_enabled: bool,
    /// Number of examples handled by one classification worker
    pub batch_block_size: usize,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            nu: 0.5,
            c1: 1.0,
            c2: 1.0,
            weight_epsilon: 1e-5,
            epsilon: 1e-5,
            tube_epsilon: 1e-2,
            c_mkl: 0.0,
            qpsize: 41,
            max_train_time: 0.0,
            shrinking_enabled: true,
            mkl_enabled: false,
            batch_computation_enabled: true,
            linadd_enabled: true,
            precomputed_subkernels_enabled: false,
            batch_block_size: 64,
        }
    }
}

/// Allocate `len` copies of `value`, reporting allocation failure as an error
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| SVMError::AllocationFailed { requested: len })?;
    buf.resize(len, value);
    Ok(buf)
}

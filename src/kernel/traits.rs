//! Kernel trait definition

use crate::core::Result;
use serde::{Deserialize, Serialize};

/// Kernel function trait
///
/// A kernel function K(x, y) must be symmetric. Implementations work on dense
/// positional feature vectors of equal length.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &[f64], y: &[f64]) -> f64;

    /// Parameters needed to rebuild this kernel
    fn params(&self) -> KernelParams;

    /// Rebuild a kernel from stored parameters
    fn from_params(params: &KernelParams) -> Result<Self>
    where
        Self: Sized;

    /// Check that feature vectors of width `dim` can be evaluated
    fn check_dim(&self, _dim: usize) -> Result<()> {
        Ok(())
    }

    /// Additive view used by the linadd optimization, if the kernel has one
    fn as_additive(&self) -> Option<&dyn AdditiveKernel> {
        None
    }
}

/// Kernels whose weighted sum over support vectors folds into a single vector
///
/// For such kernels `Σ alpha_i K(sv_i, x) == compute_folded(w, x)` where `w`
/// accumulates `fold` over every support vector.
pub trait AdditiveKernel: Send + Sync {
    /// Add `alpha * phi(x)` into `normal`
    fn fold(&self, normal: &mut [f64], x: &[f64], alpha: f64);

    /// Evaluate the folded sum against `y`
    fn compute_folded(&self, normal: &[f64], y: &[f64]) -> f64;
}

/// Serializable kernel description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelParams {
    Linear,
    WeightedDegreeRbf {
        width: f64,
        degree: usize,
        nof_properties: usize,
    },
}

impl KernelParams {
    /// Short kernel identifier
    pub fn name(&self) -> &'static str {
        match self {
            KernelParams::Linear => "linear",
            KernelParams::WeightedDegreeRbf { .. } => "weighted_degree_rbf",
        }
    }
}

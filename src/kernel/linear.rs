//! Linear kernel implementation

use crate::core::{Result, SVMError};
use crate::kernel::{AdditiveKernel, Kernel, KernelParams};

/// Linear kernel: K(x, y) = x^T * y
///
/// Additive, so a trained machine can fold its support vectors into a single
/// normal vector and classify with one dot product per example.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        assert_eq!(x.len(), y.len(), "Feature vectors must have equal length");
        dot_product(x, y)
    }

    fn params(&self) -> KernelParams {
        KernelParams::Linear
    }

    fn from_params(params: &KernelParams) -> Result<Self> {
        match params {
            KernelParams::Linear => Ok(Self),
            other => Err(SVMError::InvalidParameter(format!(
                "Expected linear kernel parameters, got {}",
                other.name()
            ))),
        }
    }

    fn as_additive(&self) -> Option<&dyn AdditiveKernel> {
        Some(self)
    }
}

impl AdditiveKernel for LinearKernel {
    fn fold(&self, normal: &mut [f64], x: &[f64], alpha: f64) {
        assert_eq!(normal.len(), x.len(), "Feature vectors must have equal length");
        for (w, &xi) in normal.iter_mut().zip(x) {
            *w += alpha * xi;
        }
    }

    fn compute_folded(&self, normal: &[f64], y: &[f64]) -> f64 {
        self.compute(normal, y)
    }
}

fn dot_product(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_kernel_basic() {
        let kernel = LinearKernel::new();

        let x = [1.0, 0.0, 2.0];
        let y = [3.0, 5.0, 0.5];

        // 1*3 + 0*5 + 2*0.5 = 4
        assert_eq!(kernel.compute(&x, &y), 4.0);
    }

    #[test]
    fn test_linear_kernel_identical() {
        let kernel = LinearKernel::new();
        let x = [1.0, 2.0, 3.0];

        // x^T * x = 1^2 + 2^2 + 3^2 = 14
        assert_eq!(kernel.compute(&x, &x), 14.0);
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn test_linear_kernel_length_mismatch() {
        LinearKernel::new().compute(&[1.0, 2.0], &[1.0]);
    }

    #[test]
    fn test_fold_matches_weighted_sum() {
        let kernel = LinearKernel::new();
        let svs = [[1.0, 2.0], [-0.5, 4.0], [3.0, 0.0]];
        let alpha = [0.7, -1.2, 0.25];
        let x = [0.3, -1.5];

        let mut normal = vec![0.0; 2];
        for (sv, &a) in svs.iter().zip(&alpha) {
            kernel.fold(&mut normal, sv, a);
        }

        let direct: f64 = svs
            .iter()
            .zip(&alpha)
            .map(|(sv, &a)| a * kernel.compute(sv, &x))
            .sum();
        assert_relative_eq!(kernel.compute_folded(&normal, &x), direct, epsilon = 1e-12);
    }

    #[test]
    fn test_params_round_trip() {
        let kernel = LinearKernel::new();
        assert_eq!(kernel.params(), KernelParams::Linear);
        assert!(LinearKernel::from_params(&KernelParams::Linear).is_ok());

        let wd = KernelParams::WeightedDegreeRbf {
            width: 1.0,
            degree: 2,
            nof_properties: 1,
        };
        assert!(LinearKernel::from_params(&wd).is_err());
    }
}

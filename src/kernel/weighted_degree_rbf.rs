//! Weighted-degree RBF kernel
//!
//! Feature vectors are read as consecutive property blocks of `nof_properties`
//! values. For every block offset `i` and every degree `d` whose window
//! `[i, i + (d + 1) * nof_properties)` fits inside the vector, the kernel adds
//!
//! ```text
//! weights[d] * exp(-||x[i..i+w] - y[i..i+w]||² / width),   w = (d + 1) * nof_properties
//! ```
//!
//! Windows that would run past the end are skipped and the remaining terms are
//! not renormalized, so blocks near the end contribute less.

use crate::core::{try_filled, Result, SVMError};
use crate::kernel::{Kernel, KernelParams};

/// Weighted-degree RBF kernel over positional property blocks
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedDegreeRBFKernel {
    width: f64,
    degree: usize,
    nof_properties: usize,
    /// Linearly decaying degree weights summing to 1
    weights: Vec<f64>,
}

impl WeightedDegreeRBFKernel {
    /// Create a kernel with bandwidth `width`, `degree` nested windows and
    /// `nof_properties` values per block
    ///
    /// # Errors
    /// Returns `InvalidParameter` if any argument is not positive, or
    /// `AllocationFailed` if the weight table cannot be allocated.
    pub fn new(width: f64, degree: usize, nof_properties: usize) -> Result<Self> {
        check_width(width)?;
        check_nof_properties(nof_properties)?;
        let mut kernel = Self {
            width,
            degree,
            nof_properties,
            weights: Vec::new(),
        };
        kernel.set_degree(degree)?;
        Ok(kernel)
    }

    /// Gaussian bandwidth
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn set_width(&mut self, width: f64) -> Result<()> {
        check_width(width)?;
        self.width = width;
        Ok(())
    }

    /// Number of nested window sizes
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Change the degree and recompute the weight table
    ///
    /// On failure the kernel keeps its previous degree and weights.
    pub fn set_degree(&mut self, degree: usize) -> Result<()> {
        if degree == 0 {
            return Err(SVMError::InvalidParameter(
                "Degree must be positive".to_string(),
            ));
        }
        self.weights = wd_weights(degree)?;
        self.degree = degree;
        Ok(())
    }

    /// Values per property block
    pub fn nof_properties(&self) -> usize {
        self.nof_properties
    }

    pub fn set_nof_properties(&mut self, nof_properties: usize) -> Result<()> {
        check_nof_properties(nof_properties)?;
        self.nof_properties = nof_properties;
        Ok(())
    }

    /// Normalized degree weights, `weights()[d]` applies to window `d + 1` blocks wide
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Rebuild the weight table for the current degree
    pub fn init_wd_weights(&mut self) -> Result<()> {
        self.weights = wd_weights(self.degree)?;
        Ok(())
    }
}

impl Kernel for WeightedDegreeRBFKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        let alen = x.len();
        let np = self.nof_properties;
        assert_eq!(alen, y.len(), "Feature vectors must have equal length");
        assert!(
            alen % np == 0,
            "Feature vector length {} is not a multiple of nof_properties {}",
            alen,
            np
        );

        let mut result = 0.0;
        for i in (0..alen).step_by(np) {
            let mut block_total = 0.0;
            // Squared distance over [i, i + (d + 1) * np), grown one block per degree
            let mut distance = 0.0;
            for (d, &weight) in self.weights.iter().enumerate() {
                let start = i + d * np;
                if start >= alen {
                    break;
                }
                for k in start..start + np {
                    let diff = x[k] - y[k];
                    distance += diff * diff;
                }
                block_total += weight * (-distance / self.width).exp();
            }
            result += block_total;
        }

        result
    }

    fn check_dim(&self, dim: usize) -> Result<()> {
        if dim % self.nof_properties != 0 {
            return Err(SVMError::InvalidParameter(format!(
                "feature width {} is not a multiple of nof_properties {}",
                dim, self.nof_properties
            )));
        }
        Ok(())
    }

    fn params(&self) -> KernelParams {
        KernelParams::WeightedDegreeRbf {
            width: self.width,
            degree: self.degree,
            nof_properties: self.nof_properties,
        }
    }

    fn from_params(params: &KernelParams) -> Result<Self> {
        match *params {
            KernelParams::WeightedDegreeRbf {
                width,
                degree,
                nof_properties,
            } => Self::new(width, degree, nof_properties),
            ref other => Err(SVMError::InvalidParameter(format!(
                "Expected weighted_degree_rbf kernel parameters, got {}",
                other.name()
            ))),
        }
    }
}

/// `weights[d] = (degree - d) / Σ (degree - d)`
fn wd_weights(degree: usize) -> Result<Vec<f64>> {
    let mut weights = try_filled(degree, 0.0)?;
    let mut sum = 0.0;
    for (d, w) in weights.iter_mut().enumerate() {
        *w = (degree - d) as f64;
        sum += *w;
    }
    for w in &mut weights {
        *w /= sum;
    }
    Ok(weights)
}

fn check_width(width: f64) -> Result<()> {
    if width > 0.0 && width.is_finite() {
        Ok(())
    } else {
        Err(SVMError::InvalidParameter(format!(
            "Width must be positive, got: {width}"
        )))
    }
}

fn check_nof_properties(nof_properties: usize) -> Result<()> {
    if nof_properties == 0 {
        return Err(SVMError::InvalidParameter(
            "nof_properties must be positive".to_string(),
        ));
    }
    Ok(())
}

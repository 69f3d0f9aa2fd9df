//! Kernel machine dispatch
//!
//! A [`KernelMachine`] binds a kernel to the training (left) and test (right)
//! feature sets and evaluates K(training\[i\], test\[j\]). Batch classification
//! splits its output buffer into disjoint blocks, each filled by one
//! [`ClassifyTask`] that only reads the shared model and kernel.

use crate::core::{DenseFeatures, Result, SVMError};
use crate::kernel::{AdditiveKernel, Kernel};
use crate::model::SupportVectorModel;
use std::sync::Arc;

/// Kernel bound to the feature sets it is evaluated against
pub struct KernelMachine<K: Kernel> {
    kernel: Arc<K>,
    lhs: Option<Arc<DenseFeatures>>,
    rhs: Option<Arc<DenseFeatures>>,
}

impl<K: Kernel> KernelMachine<K> {
    /// Create a machine without attached features
    pub fn new(kernel: K) -> Self {
        Self {
            kernel: Arc::new(kernel),
            lhs: None,
            rhs: None,
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub(crate) fn set_kernel(&mut self, kernel: K) {
        self.kernel = Arc::new(kernel);
    }

    /// Attach training and test features; both must share one row width the
    /// kernel accepts
    pub fn init(&mut self, lhs: Arc<DenseFeatures>, rhs: Arc<DenseFeatures>) -> Result<()> {
        self.kernel.check_dim(lhs.dim())?;
        check_same_dim(&lhs, &rhs)?;
        self.lhs = Some(lhs);
        self.rhs = Some(rhs);
        Ok(())
    }

    /// Attach training features, checked against the current test set
    pub fn set_training_features(&mut self, lhs: Arc<DenseFeatures>) -> Result<()> {
        self.kernel.check_dim(lhs.dim())?;
        if let Some(rhs) = &self.rhs {
            check_same_dim(&lhs, rhs)?;
        }
        self.lhs = Some(lhs);
        Ok(())
    }

    /// Attach the default test set, checked against the training set
    pub fn set_test_features(&mut self, rhs: Arc<DenseFeatures>) -> Result<()> {
        self.kernel.check_dim(rhs.dim())?;
        if let Some(lhs) = &self.lhs {
            check_same_dim(lhs, &rhs)?;
        }
        self.rhs = Some(rhs);
        Ok(())
    }

    pub fn clear_test_features(&mut self) {
        self.rhs = None;
    }

    pub fn training_features(&self) -> Option<&Arc<DenseFeatures>> {
        self.lhs.as_ref()
    }

    pub fn test_features(&self) -> Option<&Arc<DenseFeatures>> {
        self.rhs.as_ref()
    }

    /// K(training\[i\], test\[j\])
    ///
    /// # Panics
    /// Panics if either feature set is absent or an index is out of range.
    pub fn kernel_value(&self, i: usize, j: usize) -> f64 {
        match &self.rhs {
            Some(rhs) => self.kernel_value_against(i, rhs, j),
            None => panic!("kernel_value requires test features"),
        }
    }

    /// K(training\[i\], features\[j\]) for an arbitrary example set
    ///
    /// # Panics
    /// Panics if no training features are attached or an index is out of range.
    pub fn kernel_value_against(&self, i: usize, features: &DenseFeatures, j: usize) -> f64 {
        let lhs = self.lhs();
        self.kernel.compute(lhs.row(i), features.row(j))
    }

    /// K(training\[i\], training\[j\])
    pub fn training_kernel_value(&self, i: usize, j: usize) -> f64 {
        let lhs = self.lhs();
        self.kernel.compute(lhs.row(i), lhs.row(j))
    }

    fn lhs(&self) -> &DenseFeatures {
        match &self.lhs {
            Some(lhs) => lhs,
            None => panic!("kernel_value requires training features"),
        }
    }
}

fn check_same_dim(lhs: &DenseFeatures, rhs: &DenseFeatures) -> Result<()> {
    if lhs.dim() != rhs.dim() {
        return Err(SVMError::DimensionMismatch {
            expected: lhs.dim(),
            actual: rhs.dim(),
        });
    }
    Ok(())
}

/// Kernel-internal cache derived from one model generation
#[derive(Debug, Clone)]
pub enum KernelOptimization {
    /// Support vectors folded into one normal vector (additive kernels)
    Linadd { normal: Vec<f64>, generation: u64 },
    /// K(sv_i, test_j) for every support vector and every example of one
    /// test set, stored as `gram[j * num_svs + i]`
    Precomputed {
        gram: Vec<f64>,
        features: Arc<DenseFeatures>,
        generation: u64,
    },
}

impl KernelOptimization {
    /// Model generation this optimization was built from
    pub fn generation(&self) -> u64 {
        match self {
            KernelOptimization::Linadd { generation, .. }
            | KernelOptimization::Precomputed { generation, .. } => *generation,
        }
    }
}

/// How a decision value is obtained for one example
#[derive(Clone, Copy)]
pub(crate) enum Scorer<'a> {
    /// `b + Σ alpha_i K(sv_i, x)`
    Direct,
    /// `b + K_folded(w, x)`
    Folded {
        kernel: &'a dyn AdditiveKernel,
        normal: &'a [f64],
    },
    /// `b + Σ alpha_i gram[j * n + i]`
    Gram(&'a [f64]),
}

/// Decision value of example `j` of `features`
pub(crate) fn decision_value<K: Kernel>(
    machine: &KernelMachine<K>,
    model: &SupportVectorModel,
    features: &DenseFeatures,
    scorer: Scorer<'_>,
    j: usize,
) -> f64 {
    match scorer {
        Scorer::Direct => model.iter().fold(model.bias(), |score, (alpha, sv)| {
            score + alpha * machine.kernel_value_against(sv, features, j)
        }),
        Scorer::Folded { kernel, normal } => {
            model.bias() + kernel.compute_folded(normal, features.row(j))
        }
        Scorer::Gram(gram) => {
            let n = model.num_support_vectors();
            let column = &gram[j * n..(j + 1) * n];
            model
                .alpha_slice()
                .iter()
                .zip(column)
                .fold(model.bias(), |score, (alpha, k)| score + alpha * k)
        }
    }
}

/// One unit of batch classification work
///
/// Fills `output[k]` with the decision value of example `start + k`. Tasks
/// share only read-only state and own disjoint output slices, so any number
/// of them can run in parallel.
pub struct ClassifyTask<'a, K: Kernel> {
    pub(crate) machine: &'a KernelMachine<K>,
    pub(crate) model: &'a SupportVectorModel,
    pub(crate) features: &'a DenseFeatures,
    pub(crate) scorer: Scorer<'a>,
    pub(crate) start: usize,
    pub(crate) output: &'a mut [f64],
}

impl<K: Kernel> ClassifyTask<'_, K> {
    /// Example indices covered by this task
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.output.len()
    }

    pub fn run(self) {
        for (offset, out) in self.output.iter_mut().enumerate() {
            *out = decision_value(
                self.machine,
                self.model,
                self.features,
                self.scorer,
                self.start + offset,
            );
        }
    }
}

//! Support vector classifier
//!
//! [`SVM`] composes a [`SupportVectorModel`] with a [`KernelMachine`] and
//! exposes the hyperparameters, model accessors and classification entry
//! points.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wdsvm::{DenseFeatures, WeightedDegreeRBFKernel, SVM};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let train = Arc::new(DenseFeatures::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]])?);
//! let test = Arc::new(DenseFeatures::from_rows(&[vec![0.2, 0.9]])?);
//!
//! let mut svm = SVM::new(WeightedDegreeRBFKernel::new(1.0, 2, 1)?);
//! svm.set_features(train, test)?;
//! svm.create_new_model(2)?;
//! svm.set_support_vectors(&[0, 1]);
//! svm.set_alphas(&[1.0, -1.0]);
//!
//! let predictions = svm.classify(None)?;
//! println!("label = {}", predictions[0].label);
//! # Ok(())
//! # }
//! ```
//!
//! # Snapshots
//!
//! The model lives behind an `Arc` and is copied on write, so a
//! [`snapshot`](SVM::snapshot) taken before a long classification pass stays
//! valid while the classifier is updated. Every mutation advances a
//! generation counter; kernel optimizations built for an older generation are
//! ignored.

use crate::cache::KernelCache;
use crate::core::{try_filled, DenseFeatures, Prediction, Result, SVMError, SVMModel, SvmParams};
use crate::kernel::{Kernel, WeightedDegreeRBFKernel};
use crate::machine::{decision_value, ClassifyTask, KernelMachine, KernelOptimization, Scorer};
use crate::model::SupportVectorModel;
use crate::persistence::SerializableModel;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

/// Memory budget for kernel values memoized by `compute_objective`
const OBJECTIVE_CACHE_BYTES: usize = 64 * 1024 * 1024;

/// Kernel support vector classifier
pub struct SVM<K: Kernel = WeightedDegreeRBFKernel> {
    machine: KernelMachine<K>,
    model: Arc<SupportVectorModel>,
    params: SvmParams,
    objective: f64,
    generation: u64,
    optimization: Option<KernelOptimization>,
}

impl<K: Kernel> SVM<K> {
    /// Create an SVM with an empty model and default hyperparameters
    pub fn new(kernel: K) -> Self {
        Self::with_params(kernel, SvmParams::default())
    }

    /// Create an SVM with explicit hyperparameters
    pub fn with_params(kernel: K, params: SvmParams) -> Self {
        Self {
            machine: KernelMachine::new(kernel),
            model: Arc::new(SupportVectorModel::new()),
            params,
            objective: 0.0,
            generation: 0,
            optimization: None,
        }
    }

    /// Create an SVM from a saved model file, rebuilding its kernel
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let stored = SerializableModel::load_from_file(path)?;
        let kernel = K::from_params(&stored.kernel)?;
        let mut svm = Self::with_params(kernel, stored.params.clone());
        svm.model = Arc::new(stored.to_model()?);
        svm.objective = stored.objective;
        Ok(svm)
    }

    /// Set both regularization constants
    pub fn with_c(mut self, c: f64) -> Self {
        self.params.c1 = c;
        self.params.c2 = c;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.params.epsilon = epsilon;
        self
    }

    pub fn with_linadd(mut self, enable: bool) -> Self {
        self.params.linadd_enabled = enable;
        self
    }

    pub fn with_batch_computation(mut self, enable: bool) -> Self {
        self.params.batch_computation_enabled = enable;
        self
    }

    pub fn with_precomputed_subkernels(mut self, enable: bool) -> Self {
        self.params.precomputed_subkernels_enabled = enable;
        self
    }

    /// Examples per classification worker (at least one)
    pub fn with_batch_block_size(mut self, block_size: usize) -> Self {
        self.params.batch_block_size = block_size.max(1);
        self
    }

    // ---------------------------------------------------------------------
    // Hyperparameters
    // ---------------------------------------------------------------------

    pub fn params(&self) -> &SvmParams {
        &self.params
    }

    pub fn set_params(&mut self, params: SvmParams) {
        self.params = params;
    }

    pub fn set_nu(&mut self, nu: f64) {
        self.params.nu = nu;
    }

    pub fn nu(&self) -> f64 {
        self.params.nu
    }

    /// Set the regularization constants for positive (`c1`) and negative (`c2`) examples
    pub fn set_c(&mut self, c1: f64, c2: f64) {
        self.params.c1 = c1;
        self.params.c2 = c2;
    }

    pub fn c1(&self) -> f64 {
        self.params.c1
    }

    pub fn c2(&self) -> f64 {
        self.params.c2
    }

    pub fn set_weight_epsilon(&mut self, eps: f64) {
        self.params.weight_epsilon = eps;
    }

    pub fn weight_epsilon(&self) -> f64 {
        self.params.weight_epsilon
    }

    pub fn set_epsilon(&mut self, eps: f64) {
        self.params.epsilon = eps;
    }

    pub fn epsilon(&self) -> f64 {
        self.params.epsilon
    }

    pub fn set_tube_epsilon(&mut self, eps: f64) {
        self.params.tube_epsilon = eps;
    }

    pub fn tube_epsilon(&self) -> f64 {
        self.params.tube_epsilon
    }

    pub fn set_c_mkl(&mut self, c: f64) {
        self.params.c_mkl = c;
    }

    pub fn c_mkl(&self) -> f64 {
        self.params.c_mkl
    }

    pub fn set_qpsize(&mut self, qpsize: usize) {
        self.params.qpsize = qpsize;
    }

    pub fn qpsize(&self) -> usize {
        self.params.qpsize
    }

    /// Stored for the training procedure; classification ignores it
    pub fn set_max_train_time(&mut self, seconds: f64) {
        self.params.max_train_time = seconds;
    }

    pub fn max_train_time(&self) -> f64 {
        self.params.max_train_time
    }

    pub fn set_shrinking_enabled(&mut self, enable: bool) {
        self.params.shrinking_enabled = enable;
    }

    pub fn shrinking_enabled(&self) -> bool {
        self.params.shrinking_enabled
    }

    pub fn set_mkl_enabled(&mut self, enable: bool) {
        self.params.mkl_enabled = enable;
    }

    pub fn mkl_enabled(&self) -> bool {
        self.params.mkl_enabled
    }

    /// Classify blocks of examples in parallel
    pub fn set_batch_computation_enabled(&mut self, enable: bool) {
        self.params.batch_computation_enabled = enable;
    }

    pub fn batch_computation_enabled(&self) -> bool {
        self.params.batch_computation_enabled
    }

    /// Use the folded support vector normal for additive kernels
    pub fn set_linadd_enabled(&mut self, enable: bool) {
        self.params.linadd_enabled = enable;
    }

    pub fn linadd_enabled(&self) -> bool {
        self.params.linadd_enabled
    }

    /// Use a precomputed support vector × test Gram block
    pub fn set_precomputed_subkernels_enabled(&mut self, enable: bool) {
        self.params.precomputed_subkernels_enabled = enable;
    }

    pub fn precomputed_subkernels_enabled(&self) -> bool {
        self.params.precomputed_subkernels_enabled
    }

    // ---------------------------------------------------------------------
    // Model
    // ---------------------------------------------------------------------

    /// Mutable access to the model, advancing the generation
    fn model_mut(&mut self) -> &mut SupportVectorModel {
        self.generation += 1;
        Arc::make_mut(&mut self.model)
    }

    /// Replace the model with `num` zeroed support vectors and a zero bias
    ///
    /// On allocation failure the current model is kept.
    pub fn create_new_model(&mut self, num: usize) -> Result<()> {
        let fresh = SupportVectorModel::with_capacity(num)?;
        self.set_model(fresh);
        Ok(())
    }

    /// Replace the whole model
    pub fn set_model(&mut self, model: SupportVectorModel) {
        self.generation += 1;
        self.model = Arc::new(model);
    }

    /// Stable handle on the current model
    pub fn snapshot(&self) -> Arc<SupportVectorModel> {
        Arc::clone(&self.model)
    }

    /// Current model generation; advances on every mutation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn num_support_vectors(&self) -> usize {
        self.model.num_support_vectors()
    }

    pub fn bias(&self) -> f64 {
        self.model.bias()
    }

    pub fn set_bias(&mut self, bias: f64) {
        self.model_mut().set_bias(bias);
    }

    /// # Panics
    /// Panics if `idx >= num_support_vectors()`
    pub fn alpha(&self, idx: usize) -> f64 {
        self.model.alpha(idx)
    }

    /// # Panics
    /// Panics if `idx >= num_support_vectors()`
    pub fn support_vector(&self, idx: usize) -> usize {
        self.model.support_vector(idx)
    }

    /// Write one coefficient; out-of-range indices fail without mutating
    pub fn set_alpha(&mut self, idx: usize, value: f64) -> Result<()> {
        self.check_slot(idx)?;
        self.model_mut().set_alpha(idx, value)
    }

    /// Write one support vector index; out-of-range indices fail without mutating
    pub fn set_support_vector(&mut self, idx: usize, value: usize) -> Result<()> {
        self.check_slot(idx)?;
        self.model_mut().set_support_vector(idx, value)
    }

    fn check_slot(&self, idx: usize) -> Result<()> {
        let len = self.model.num_support_vectors();
        if idx >= len {
            return Err(SVMError::IndexOutOfBounds { index: idx, len });
        }
        Ok(())
    }

    /// Owned copy of the coefficients
    pub fn alphas(&self) -> Vec<f64> {
        self.model.alphas()
    }

    /// Owned copy of the support vector indices
    pub fn support_vectors(&self) -> Vec<usize> {
        self.model.support_vectors()
    }

    /// # Panics
    /// Panics if `alphas.len() != num_support_vectors()`
    pub fn set_alphas(&mut self, alphas: &[f64]) {
        self.model_mut().set_alphas(alphas);
    }

    /// # Panics
    /// Panics if `svs.len() != num_support_vectors()`
    pub fn set_support_vectors(&mut self, svs: &[usize]) {
        self.model_mut().set_support_vectors(svs);
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn set_objective(&mut self, objective: f64) {
        self.objective = objective;
    }

    /// Compute and store the dual objective
    /// `0.5 Σ_i Σ_j alpha_i alpha_j K(sv_i, sv_j) - Σ_i alpha_i y_{sv_i}`
    ///
    /// `labels` holds the ±1 label of every training example.
    pub fn compute_objective(&mut self, labels: &[f64]) -> Result<f64> {
        let lhs = self
            .machine
            .training_features()
            .ok_or(SVMError::NoTrainingFeatures)?;
        if labels.len() != lhs.len() {
            return Err(SVMError::DimensionMismatch {
                expected: lhs.len(),
                actual: labels.len(),
            });
        }
        self.check_training_set(lhs)?;

        let model = &self.model;
        let mut cache =
            KernelCache::for_support_vectors(model.num_support_vectors(), OBJECTIVE_CACHE_BYTES);
        let mut objective = 0.0;
        for (alpha_i, sv_i) in model.iter() {
            objective -= alpha_i * labels[sv_i];
            for (alpha_j, sv_j) in model.iter() {
                let k = cache.get_or_compute(sv_i, sv_j, || {
                    self.machine.training_kernel_value(sv_i, sv_j)
                });
                objective += 0.5 * alpha_i * alpha_j * k;
            }
        }
        debug!(
            "Objective {:.6} over {} support vectors (cache hit rate {:.2})",
            objective,
            model.num_support_vectors(),
            cache.hit_rate()
        );

        self.objective = objective;
        Ok(objective)
    }

    // ---------------------------------------------------------------------
    // Kernel machine
    // ---------------------------------------------------------------------

    pub fn kernel(&self) -> &K {
        self.machine.kernel()
    }

    pub fn machine(&self) -> &KernelMachine<K> {
        &self.machine
    }

    /// Attach the training set (support vector indices refer to it) and the
    /// default test set
    pub fn set_features(&mut self, lhs: Arc<DenseFeatures>, rhs: Arc<DenseFeatures>) -> Result<()> {
        self.machine.init(lhs, rhs)?;
        self.generation += 1;
        Ok(())
    }

    pub fn set_training_features(&mut self, lhs: Arc<DenseFeatures>) -> Result<()> {
        self.machine.set_training_features(lhs)?;
        self.generation += 1;
        Ok(())
    }

    /// Replace the default test set used when `classify` gets no examples
    pub fn set_test_features(&mut self, rhs: Arc<DenseFeatures>) -> Result<()> {
        self.machine.set_test_features(rhs)
    }

    /// Build kernel-internal caches for the current model
    ///
    /// Must be called again after the model or the training set changes;
    /// until then the stale optimization is bypassed.
    pub fn init_kernel_optimization(&mut self) -> Result<()> {
        let lhs = self
            .machine
            .training_features()
            .ok_or(SVMError::NoTrainingFeatures)?;
        self.check_training_set(lhs)?;

        let optimization = if let (true, Some(additive)) =
            (self.params.linadd_enabled, self.kernel().as_additive())
        {
            let mut normal = try_filled(lhs.dim(), 0.0)?;
            for (alpha, sv) in self.model.iter() {
                additive.fold(&mut normal, lhs.row(sv), alpha);
            }
            debug!("Folded {} support vectors into a normal vector", self.num_support_vectors());
            Some(KernelOptimization::Linadd {
                normal,
                generation: self.generation,
            })
        } else if let (true, Some(rhs)) = (
            self.params.precomputed_subkernels_enabled,
            self.machine.test_features(),
        ) {
            let gram = self.gram_block(rhs)?;
            debug!(
                "Precomputed {} x {} kernel block",
                self.num_support_vectors(),
                rhs.len()
            );
            Some(KernelOptimization::Precomputed {
                gram,
                features: Arc::clone(rhs),
                generation: self.generation,
            })
        } else {
            debug!("No kernel optimization applies; using direct evaluation");
            None
        };

        self.optimization = optimization;
        Ok(())
    }

    /// Drop any kernel optimization
    pub fn clear_kernel_optimization(&mut self) {
        self.optimization = None;
    }

    pub fn kernel_optimization(&self) -> Option<&KernelOptimization> {
        self.optimization.as_ref()
    }

    /// K(sv_i, rhs_j) laid out as `gram[j * num_svs + i]`
    fn gram_block(&self, rhs: &DenseFeatures) -> Result<Vec<f64>> {
        let model = &self.model;
        let n = model.num_support_vectors();
        let mut gram = try_filled(gram_len(n, rhs.len())?, 0.0)?;
        if n == 0 {
            return Ok(gram);
        }
        let fill = |(j, column): (usize, &mut [f64])| {
            for (k, sv) in column.iter_mut().zip(model.support_vector_slice()) {
                *k = self.machine.kernel_value_against(*sv, rhs, j);
            }
        };
        if self.params.batch_computation_enabled {
            gram.par_chunks_mut(n).enumerate().for_each(fill);
        } else {
            gram.chunks_mut(n).enumerate().for_each(fill);
        }
        Ok(gram)
    }

    /// Pick the fastest valid way to score `features`
    fn scorer<'a>(&'a self, features: &DenseFeatures) -> Scorer<'a> {
        match &self.optimization {
            Some(opt) if opt.generation() != self.generation => {
                warn!(
                    "Kernel optimization from generation {} is stale (model at {}); call init_kernel_optimization",
                    opt.generation(),
                    self.generation
                );
                Scorer::Direct
            }
            Some(KernelOptimization::Linadd { normal, .. }) if self.params.linadd_enabled => {
                match self.kernel().as_additive() {
                    Some(kernel) => Scorer::Folded {
                        kernel,
                        normal: normal.as_slice(),
                    },
                    None => Scorer::Direct,
                }
            }
            Some(KernelOptimization::Precomputed {
                gram,
                features: precomputed,
                ..
            }) if self.params.precomputed_subkernels_enabled
                && std::ptr::eq(&**precomputed, features) =>
            {
                Scorer::Gram(gram)
            }
            _ => Scorer::Direct,
        }
    }

    /// The kernel accepts the training width and every support vector
    /// indexes into the training set
    fn check_training_set(&self, lhs: &DenseFeatures) -> Result<()> {
        self.kernel().check_dim(lhs.dim())?;
        if let Some(&sv) = self.model.support_vector_slice().iter().find(|&&sv| sv >= lhs.len()) {
            return Err(SVMError::IndexOutOfBounds {
                index: sv,
                len: lhs.len(),
            });
        }
        Ok(())
    }

    /// Resolve the example set and check it against the training set
    fn resolve_examples<'a>(
        &'a self,
        examples: Option<&'a DenseFeatures>,
    ) -> Result<&'a DenseFeatures> {
        let lhs = self
            .machine
            .training_features()
            .ok_or(SVMError::NoTrainingFeatures)?;
        let features = match examples {
            Some(features) => features,
            None => self
                .machine
                .test_features()
                .map(|rhs| &**rhs)
                .ok_or(SVMError::NoTestFeatures)?,
        };
        if features.dim() != lhs.dim() {
            return Err(SVMError::DimensionMismatch {
                expected: lhs.dim(),
                actual: features.dim(),
            });
        }
        self.check_training_set(lhs)?;
        Ok(features)
    }

    // ---------------------------------------------------------------------
    // Classification
    // ---------------------------------------------------------------------

    /// Decision value of example `index` of the default test set:
    /// `b + Σ alpha_i K(sv_i, test[index])`
    ///
    /// # Panics
    /// Panics if `index` is outside the test set.
    pub fn classify_example(&self, index: usize) -> Result<f64> {
        let features = self.resolve_examples(None)?;
        Ok(decision_value(
            &self.machine,
            &self.model,
            features,
            self.scorer(features),
            index,
        ))
    }

    /// Decision values for every example, or for the default test set when
    /// `examples` is `None`
    pub fn decision_values(&self, examples: Option<&DenseFeatures>) -> Result<Vec<f64>> {
        let features = self.resolve_examples(examples)?;
        let model = self.snapshot();
        let scorer = self.scorer(features);
        let block = self.params.batch_block_size.max(1);

        let mut output = try_filled(features.len(), 0.0)?;
        let run = |(b, out): (usize, &mut [f64])| {
            ClassifyTask {
                machine: &self.machine,
                model: &model,
                features,
                scorer,
                start: b * block,
                output: out,
            }
            .run()
        };
        if self.params.batch_computation_enabled {
            output.par_chunks_mut(block).enumerate().for_each(run);
        } else {
            output.chunks_mut(block).enumerate().for_each(run);
        }
        Ok(output)
    }

    /// Classify by sign of the decision value
    pub fn classify(&self, examples: Option<&DenseFeatures>) -> Result<Vec<Prediction>> {
        self.classify_with_threshold(examples, 0.0)
    }

    /// Classify with labels +1 at or above `threshold`, -1 below
    pub fn classify_with_threshold(
        &self,
        examples: Option<&DenseFeatures>,
        threshold: f64,
    ) -> Result<Vec<Prediction>> {
        Ok(self
            .decision_values(examples)?
            .into_iter()
            .map(|value| Prediction::from_decision(value, threshold))
            .collect())
    }

    /// Classify labelled examples and tally the confusion matrix
    pub fn evaluate(&self, examples: Option<&DenseFeatures>, labels: &[f64]) -> Result<EvaluationMetrics> {
        let predictions = self.classify(examples)?;
        if predictions.len() != labels.len() {
            return Err(SVMError::DimensionMismatch {
                expected: predictions.len(),
                actual: labels.len(),
            });
        }
        Ok(EvaluationMetrics::from_predictions(&predictions, labels))
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Serializable form of the model, hyperparameters and kernel
    pub fn to_serializable(&self) -> SerializableModel {
        SerializableModel::new(&self.model, self.objective, &self.params, self.kernel().params())
    }

    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        self.to_serializable().save_to_writer(writer)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_serializable().save_to_file(path.as_ref())?;
        info!(
            "Saved model with {} support vectors to {:?}",
            self.num_support_vectors(),
            path.as_ref()
        );
        Ok(())
    }

    /// Replace model, hyperparameters and kernel from a saved document
    ///
    /// The document is fully parsed and validated first; on any error the
    /// classifier is left unchanged.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<()> {
        let stored = SerializableModel::load_from_reader(reader)?;
        self.restore(stored)
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let stored = SerializableModel::load_from_file(path.as_ref())?;
        self.restore(stored)?;
        info!(
            "Loaded model with {} support vectors from {:?}",
            self.num_support_vectors(),
            path.as_ref()
        );
        Ok(())
    }

    fn restore(&mut self, stored: SerializableModel) -> Result<()> {
        let kernel = K::from_params(&stored.kernel)?;
        let model = stored.to_model()?;

        self.machine.set_kernel(kernel);
        self.set_model(model);
        self.params = stored.params;
        self.objective = stored.objective;
        self.optimization = None;
        Ok(())
    }
}

impl<K: Kernel> SVMModel for SVM<K> {
    fn decision_function(&self, x: &[f64]) -> Result<f64> {
        let features = DenseFeatures::new(x.to_vec(), x.len())?;
        let values = self.decision_values(Some(&features))?;
        Ok(values[0])
    }

    fn n_support_vectors(&self) -> usize {
        self.num_support_vectors()
    }

    fn bias(&self) -> f64 {
        self.model.bias()
    }
}

/// Detailed evaluation metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    /// Tally predictions against ±1 labels
    pub fn from_predictions(predictions: &[Prediction], labels: &[f64]) -> Self {
        let mut metrics = Self {
            true_positives: 0,
            true_negatives: 0,
            false_positives: 0,
            false_negatives: 0,
        };
        for (pred, &actual) in predictions.iter().zip(labels) {
            match (pred.label > 0.0, actual > 0.0) {
                (true, true) => metrics.true_positives += 1,
                (false, false) => metrics.true_negatives += 1,
                (true, false) => metrics.false_positives += 1,
                (false, true) => metrics.false_negatives += 1,
            }
        }
        metrics
    }

    fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Calculate F1 score: 2 * (precision * recall) / (precision + recall)
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }

    /// Calculate specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }
}

/// Entries in a support vector x example block
fn gram_len(num_svs: usize, num_examples: usize) -> Result<usize> {
    num_svs
        .checked_mul(num_examples)
        .ok_or(SVMError::AllocationFailed {
            requested: usize::MAX,
        })
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

//! Trained support vector state
//!
//! A model is the bias plus two parallel arrays: the dual coefficient of each
//! support vector and its index into the training feature set. Both arrays are
//! always replaced together and always have exactly `num_support_vectors()`
//! entries.

use crate::core::{try_filled, Result, SVMError};

/// Bias, dual coefficients and support vector indices of a trained machine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupportVectorModel {
    bias: f64,
    alpha: Vec<f64>,
    svs: Vec<usize>,
}

impl SupportVectorModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model with `num` zeroed slots, see [`create_new_model`](Self::create_new_model)
    pub fn with_capacity(num: usize) -> Result<Self> {
        let mut model = Self::new();
        model.create_new_model(num)?;
        Ok(model)
    }

    /// Build a model from complete arrays
    ///
    /// Fails with `DimensionMismatch` if the arrays differ in length.
    pub fn from_parts(bias: f64, alpha: Vec<f64>, svs: Vec<usize>) -> Result<Self> {
        if alpha.len() != svs.len() {
            return Err(SVMError::DimensionMismatch {
                expected: svs.len(),
                actual: alpha.len(),
            });
        }
        Ok(Self { bias, alpha, svs })
    }

    /// Replace the coefficient and index arrays with `num` zeroed slots and reset the bias
    ///
    /// The new arrays are allocated before the old ones are released, so on
    /// `AllocationFailed` the model is left as it was.
    pub fn create_new_model(&mut self, num: usize) -> Result<()> {
        let alpha = try_filled(num, 0.0)?;
        let svs = try_filled(num, 0)?;
        self.alpha = alpha;
        self.svs = svs;
        self.bias = 0.0;
        Ok(())
    }

    pub fn num_support_vectors(&self) -> usize {
        self.svs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.svs.is_empty()
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn set_bias(&mut self, bias: f64) {
        self.bias = bias;
    }

    /// Dual coefficient of support vector `idx`
    ///
    /// # Panics
    /// Panics if `idx >= num_support_vectors()`
    pub fn alpha(&self, idx: usize) -> f64 {
        assert!(
            idx < self.alpha.len(),
            "Alpha index {} out of bounds for {} support vectors",
            idx,
            self.alpha.len()
        );
        self.alpha[idx]
    }

    /// Training-set index of support vector `idx`
    ///
    /// # Panics
    /// Panics if `idx >= num_support_vectors()`
    pub fn support_vector(&self, idx: usize) -> usize {
        assert!(
            idx < self.svs.len(),
            "Support vector index {} out of bounds for {} support vectors",
            idx,
            self.svs.len()
        );
        self.svs[idx]
    }

    /// Overwrite one coefficient; out-of-range indices leave the model untouched
    pub fn set_alpha(&mut self, idx: usize, value: f64) -> Result<()> {
        let len = self.alpha.len();
        let slot = self
            .alpha
            .get_mut(idx)
            .ok_or(SVMError::IndexOutOfBounds { index: idx, len })?;
        *slot = value;
        Ok(())
    }

    /// Overwrite one support vector index; out-of-range indices leave the model untouched
    pub fn set_support_vector(&mut self, idx: usize, value: usize) -> Result<()> {
        let len = self.svs.len();
        let slot = self
            .svs
            .get_mut(idx)
            .ok_or(SVMError::IndexOutOfBounds { index: idx, len })?;
        *slot = value;
        Ok(())
    }

    /// Owned copy of all coefficients
    pub fn alphas(&self) -> Vec<f64> {
        self.alpha.clone()
    }

    /// Owned copy of all support vector indices
    pub fn support_vectors(&self) -> Vec<usize> {
        self.svs.clone()
    }

    /// Overwrite every coefficient
    ///
    /// # Panics
    /// Panics if `alphas.len() != num_support_vectors()`; this never resizes.
    pub fn set_alphas(&mut self, alphas: &[f64]) {
        assert_eq!(
            alphas.len(),
            self.alpha.len(),
            "Alpha array length must equal the number of support vectors"
        );
        self.alpha.copy_from_slice(alphas);
    }

    /// Overwrite every support vector index
    ///
    /// # Panics
    /// Panics if `svs.len() != num_support_vectors()`; this never resizes.
    pub fn set_support_vectors(&mut self, svs: &[usize]) {
        assert_eq!(
            svs.len(),
            self.svs.len(),
            "Support vector array length must equal the number of support vectors"
        );
        self.svs.copy_from_slice(svs);
    }

    pub fn alpha_slice(&self) -> &[f64] {
        &self.alpha
    }

    pub fn support_vector_slice(&self) -> &[usize] {
        &self.svs
    }

    /// `(alpha_i, sv_i)` pairs in storage order
    pub fn iter(&self) -> impl Iterator<Item = (f64, usize)> + '_ {
        self.alpha.iter().copied().zip(self.svs.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_new_model_sizes() {
        let mut model = SupportVectorModel::new();
        assert_eq!(model.num_support_vectors(), 0);

        for num in [0, 1, 7, 128] {
            model.create_new_model(num).unwrap();
            assert_eq!(model.num_support_vectors(), num);
            assert_eq!(model.alphas().len(), num);
            assert_eq!(model.support_vectors().len(), num);
            if num > 0 {
                assert_eq!(model.alpha(num - 1), 0.0);
                assert_eq!(model.support_vector(num - 1), 0);
            }
        }
    }

    #[test]
    fn test_create_new_model_resets_bias() {
        let mut model = SupportVectorModel::with_capacity(2).unwrap();
        model.set_bias(3.5);
        model.set_alpha(0, 1.0).unwrap();
        model.create_new_model(3).unwrap();
        assert_eq!(model.bias(), 0.0);
        assert_eq!(model.alphas(), vec![0.0; 3]);
    }

    #[test]
    fn test_create_new_model_allocation_failure_keeps_state() {
        let mut model = SupportVectorModel::from_parts(0.25, vec![1.0, -1.0], vec![4, 9]).unwrap();
        let result = model.create_new_model(usize::MAX);
        assert!(matches!(result, Err(SVMError::AllocationFailed { .. })));
        assert_eq!(model.num_support_vectors(), 2);
        assert_eq!(model.bias(), 0.25);
        assert_eq!(model.support_vectors(), vec![4, 9]);
    }

    #[test]
    fn test_set_and_get_elements() {
        let mut model = SupportVectorModel::with_capacity(3).unwrap();
        model.set_alpha(1, -0.75).unwrap();
        model.set_support_vector(2, 42).unwrap();
        assert_eq!(model.alpha(1), -0.75);
        assert_eq!(model.support_vector(2), 42);
    }

    #[test]
    fn test_out_of_range_setters_do_not_mutate() {
        let mut model = SupportVectorModel::with_capacity(2).unwrap();
        let before = model.clone();

        assert!(matches!(
            model.set_alpha(2, 1.0),
            Err(SVMError::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert!(model.set_support_vector(5, 1).is_err());
        assert_eq!(model, before);

        let mut empty = SupportVectorModel::new();
        assert!(empty.set_alpha(0, 1.0).is_err());
        assert!(empty.set_support_vector(0, 1).is_err());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_alpha_out_of_range_panics() {
        SupportVectorModel::with_capacity(1).unwrap().alpha(1);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_support_vector_on_empty_model_panics() {
        SupportVectorModel::new().support_vector(0);
    }

    #[test]
    fn test_copies_are_independent() {
        let mut model = SupportVectorModel::from_parts(0.0, vec![0.5, -0.5], vec![0, 1]).unwrap();

        let mut alphas = model.alphas();
        let mut svs = model.support_vectors();
        alphas[0] = 100.0;
        svs[1] = 100;

        assert_eq!(model.alpha(0), 0.5);
        assert_eq!(model.support_vector(1), 1);

        model.set_alpha(0, 2.0).unwrap();
        assert_eq!(alphas[0], 100.0);
    }

    #[test]
    fn test_bulk_setters() {
        let mut model = SupportVectorModel::with_capacity(3).unwrap();
        model.set_alphas(&[1.0, 2.0, 3.0]);
        model.set_support_vectors(&[7, 8, 9]);
        assert_eq!(model.alpha_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(model.support_vector_slice(), &[7, 8, 9]);
        assert_eq!(
            model.iter().collect::<Vec<_>>(),
            vec![(1.0, 7), (2.0, 8), (3.0, 9)]
        );
    }

    #[test]
    #[should_panic(expected = "Alpha array length")]
    fn test_set_alphas_length_mismatch_panics() {
        let mut model = SupportVectorModel::with_capacity(3).unwrap();
        model.set_alphas(&[1.0, 2.0]);
    }

    #[test]
    #[should_panic(expected = "Support vector array length")]
    fn test_set_support_vectors_length_mismatch_panics() {
        let mut model = SupportVectorModel::with_capacity(1).unwrap();
        model.set_support_vectors(&[1, 2]);
    }

    #[test]
    fn test_from_parts_rejects_mismatched_arrays() {
        assert!(SupportVectorModel::from_parts(0.0, vec![1.0], vec![0, 1]).is_err());
    }
}

//! Integration tests for the wdsvm library
//!
//! These tests exercise the classifier end to end: feature loading, model
//! assembly, classification through every dispatch path and persistence.

use approx::assert_abs_diff_eq;
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};
use wdsvm::api::SVM;
use wdsvm::{
    CSVDataset, DenseFeatures, Kernel, KernelOptimization, LinearKernel, SVMError,
    SVMModel, SerializableModel, SupportVectorModel, WeightedDegreeRBFKernel,
};

fn features(rows: &[Vec<f64>]) -> Arc<DenseFeatures> {
    Arc::new(DenseFeatures::from_rows(rows).expect("valid rows"))
}

/// Positional sequences encoded with two properties per position
fn sequence_features() -> (Arc<DenseFeatures>, Arc<DenseFeatures>) {
    let train = features(&[
        vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0],
        vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0],
        vec![0.0, 1.0, 0.0, 1.0, 1.0, 0.0],
    ]);
    let test = features(&[
        vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0],
        vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        vec![0.9, 0.1, 1.0, 0.0, 0.8, 0.2],
        vec![0.1, 0.9, 0.0, 1.0, 0.2, 0.8],
    ]);
    (train, test)
}

fn sequence_svm() -> SVM {
    let (train, test) = sequence_features();
    let kernel = WeightedDegreeRBFKernel::new(1.0, 3, 2).expect("valid kernel");
    let mut svm = SVM::new(kernel);
    svm.set_features(train, test).expect("matching widths");
    svm.set_model(
        SupportVectorModel::from_parts(0.0, vec![1.0, -1.0, 0.5, -0.5], vec![0, 1, 2, 3])
            .expect("consistent model"),
    );
    svm
}

#[test]
fn test_decision_function_scenario() {
    // k(sv0, x) = 2.0 and k(sv1, x) = 1.0 under the linear kernel
    let mut svm = SVM::new(LinearKernel::new());
    svm.set_features(features(&[vec![2.0], vec![1.0]]), features(&[vec![1.0]]))
        .unwrap();
    svm.create_new_model(2).unwrap();
    svm.set_support_vectors(&[0, 1]);
    svm.set_alphas(&[0.5, -0.5]);
    svm.set_bias(0.1);

    assert_abs_diff_eq!(svm.classify_example(0).unwrap(), 0.6, epsilon = 1e-12);

    let predictions = svm.classify(None).unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].label, 1.0);
    assert_abs_diff_eq!(predictions[0].decision_value, 0.6, epsilon = 1e-12);
}

#[test]
fn test_weighted_degree_end_to_end_value() {
    let kernel = WeightedDegreeRBFKernel::new(1.0, 2, 1).unwrap();
    let expected = 2.0 / 3.0 * (-1.0f64).exp() + 1.0 / 3.0 * (-2.0f64).exp()
        + 2.0 / 3.0 * (-1.0f64).exp();

    assert_abs_diff_eq!(kernel.compute(&[0.0, 0.0], &[1.0, 1.0]), expected, epsilon = 1e-9);
}

#[test]
fn test_sequence_classification() {
    let svm = sequence_svm();
    let predictions = svm.classify(None).unwrap();

    let labels: Vec<f64> = predictions.iter().map(|p| p.label).collect();
    assert_eq!(labels, vec![1.0, -1.0, 1.0, -1.0]);

    // Decision values match the dispatcher evaluated one example at a time
    for (j, prediction) in predictions.iter().enumerate() {
        assert_abs_diff_eq!(
            prediction.decision_value,
            svm.classify_example(j).unwrap(),
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_dispatch_paths_agree() {
    let mut svm = sequence_svm().with_batch_block_size(1);
    let direct = svm.decision_values(None).unwrap();

    svm.set_batch_computation_enabled(false);
    assert_eq!(svm.decision_values(None).unwrap(), direct);

    svm.set_batch_computation_enabled(true);
    svm.set_precomputed_subkernels_enabled(true);
    svm.init_kernel_optimization().unwrap();
    assert!(matches!(
        svm.kernel_optimization(),
        Some(KernelOptimization::Precomputed { .. })
    ));
    let precomputed = svm.decision_values(None).unwrap();
    for (a, b) in direct.iter().zip(&precomputed) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
}

#[test]
fn test_stale_optimization_is_not_used() {
    let mut svm = sequence_svm().with_precomputed_subkernels(true);
    svm.init_kernel_optimization().unwrap();
    let before = svm.decision_values(None).unwrap();

    svm.set_alpha(0, 2.0).unwrap();
    let after = svm.decision_values(None).unwrap();
    assert_ne!(before, after);

    svm.clear_kernel_optimization();
    let direct = svm.decision_values(None).unwrap();
    for (a, b) in after.iter().zip(&direct) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
}

#[test]
fn test_snapshot_survives_updates() {
    let mut svm = sequence_svm();
    let snapshot = svm.snapshot();

    svm.create_new_model(1).unwrap();
    svm.set_support_vector(0, 3).unwrap();

    assert_eq!(snapshot.num_support_vectors(), 4);
    assert_eq!(snapshot.support_vector(3), 3);
    assert_eq!(svm.num_support_vectors(), 1);
}

#[test]
fn test_explicit_examples_override_test_set() {
    let svm = sequence_svm();
    let examples = DenseFeatures::from_rows(&[vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]]).unwrap();

    let predictions = svm.classify(Some(&examples)).unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].label, -1.0);

    let wrong_width = DenseFeatures::from_rows(&[vec![1.0, 0.0]]).unwrap();
    assert!(matches!(
        svm.classify(Some(&wrong_width)),
        Err(SVMError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_csv_workflow() {
    let mut train_file = NamedTempFile::with_suffix(".csv").expect("Failed to create temp file");
    writeln!(train_file, "p0a,p0b,p1a,p1b").unwrap();
    writeln!(train_file, "1.0,0.0,1.0,0.0").unwrap();
    writeln!(train_file, "0.0,1.0,0.0,1.0").unwrap();
    train_file.flush().unwrap();

    let mut test_file = NamedTempFile::with_suffix(".csv").expect("Failed to create temp file");
    writeln!(test_file, "0.9,0.1,1.0,0.0,1").unwrap();
    writeln!(test_file, "0.1,0.9,0.0,1.0,-1").unwrap();
    writeln!(test_file, "1.0,0.0,0.9,0.1,1").unwrap();
    test_file.flush().unwrap();

    let train = CSVDataset::from_file(train_file.path(), false).unwrap();
    let (test, labels) = CSVDataset::from_file(test_file.path(), true)
        .unwrap()
        .into_parts();
    let labels = labels.unwrap();

    let mut svm = SVM::new(WeightedDegreeRBFKernel::new(0.5, 2, 2).unwrap());
    svm.set_features(Arc::new(train.into_parts().0), Arc::new(test))
        .unwrap();
    svm.set_model(SupportVectorModel::from_parts(0.0, vec![1.0, -1.0], vec![0, 1]).unwrap());

    let metrics = svm.evaluate(None, &labels).unwrap();
    assert_eq!(metrics.accuracy(), 1.0);
    assert_eq!(metrics.true_positives, 2);
    assert_eq!(metrics.true_negatives, 1);
}

#[test]
fn test_persistence_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let mut svm = sequence_svm();
    svm.set_bias(-0.25);
    svm.set_c(2.0, 3.0);
    svm.set_qpsize(17);
    svm.set_linadd_enabled(false);
    svm.set_objective(-1.5);
    svm.save_to_file(&model_path).expect("save should succeed");

    let loaded: SVM = SVM::from_file(&model_path).expect("load should succeed");
    assert_eq!(loaded.bias(), -0.25);
    assert_eq!(loaded.alphas(), svm.alphas());
    assert_eq!(loaded.support_vectors(), svm.support_vectors());
    assert_eq!(loaded.params(), svm.params());
    assert_eq!(loaded.objective(), -1.5);
    assert_eq!(loaded.kernel(), svm.kernel());

    let stored = SerializableModel::load_from_file(&model_path).unwrap();
    assert_eq!(stored.num_svs, 4);
    assert_eq!(stored.kernel, svm.kernel().params());
}

#[test]
fn test_loaded_model_classifies_identically() {
    let svm = sequence_svm();
    let mut buffer = Vec::new();
    svm.save(&mut buffer).unwrap();

    let (train, test) = sequence_features();
    let mut restored = SVM::new(WeightedDegreeRBFKernel::new(9.0, 1, 1).unwrap());
    restored.load(buffer.as_slice()).unwrap();
    restored.set_features(train, test).unwrap();

    assert_eq!(restored.kernel().degree(), 3);
    assert_eq!(
        restored.decision_values(None).unwrap(),
        svm.decision_values(None).unwrap()
    );
}

#[test]
fn test_failed_load_keeps_model() {
    let mut svm = sequence_svm();
    let before = svm.alphas();

    let linear = SVM::new(LinearKernel::new());
    let mut buffer = Vec::new();
    linear.save(&mut buffer).unwrap();

    // A linear-kernel document cannot configure a weighted-degree classifier
    assert!(svm.load(buffer.as_slice()).is_err());
    assert!(svm.load(&b"{\"bias\": 1.0"[..]).is_err());
    assert_eq!(svm.alphas(), before);
    assert_eq!(svm.kernel().degree(), 3);
}

#[test]
fn test_objective_uses_training_labels() {
    let mut svm = sequence_svm();
    let labels = [1.0, -1.0, 1.0, -1.0];
    let objective = svm.compute_objective(&labels).unwrap();

    let model = svm.snapshot();
    let train = svm.machine().training_features().unwrap().clone();
    let kernel = svm.kernel();
    let mut quadratic = 0.0;
    for (ai, si) in model.iter() {
        for (aj, sj) in model.iter() {
            quadratic += ai * aj * kernel.compute(train.row(si), train.row(sj));
        }
    }
    let linear: f64 = model.iter().map(|(a, s)| a * labels[s]).sum();

    assert_abs_diff_eq!(objective, 0.5 * quadratic - linear, epsilon = 1e-12);
    assert_eq!(svm.objective(), objective);
}

#[test]
fn test_trait_object_usage() {
    let svm = sequence_svm();
    let model: &dyn SVMModel = &svm;

    assert_eq!(model.n_support_vectors(), 4);
    let value = model.decision_function(&[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]).unwrap();
    assert!(value > 0.0);
    assert_eq!(model.predict(&[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]).unwrap().label, 1.0);
}

//! Model serialization and persistence
//!
//! A saved model is a JSON document holding the bias, the support vector
//! indices and coefficients, the hyperparameters and the kernel parameters.
//! Training features are not stored; support vector indices refer to the
//! training set the model is paired with at classification time.

use crate::core::{Result, SVMError, SvmParams};
use crate::kernel::KernelParams;
use crate::model::SupportVectorModel;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Serializable representation of a trained SVM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableModel {
    pub bias: f64,
    pub num_svs: usize,
    /// Sign-carrying dual coefficients
    pub alpha: Vec<f64>,
    /// Training-set indices of the support vectors
    pub svs: Vec<usize>,
    pub objective: f64,
    pub params: SvmParams,
    pub kernel: KernelParams,
    pub metadata: ModelMetadata,
}

/// Model metadata for tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Creation timestamp
    pub created_at: String,
}

impl SerializableModel {
    /// Capture a model with its hyperparameters and kernel description
    pub fn new(
        model: &SupportVectorModel,
        objective: f64,
        params: &SvmParams,
        kernel: KernelParams,
    ) -> Self {
        Self {
            bias: model.bias(),
            num_svs: model.num_support_vectors(),
            alpha: model.alphas(),
            svs: model.support_vectors(),
            objective,
            params: params.clone(),
            kernel,
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    /// Check that the coefficient and index arrays both hold `num_svs` entries
    /// and that every stored float is finite
    pub fn validate(&self) -> Result<()> {
        if self.alpha.len() != self.num_svs {
            return Err(SVMError::MalformedModel(format!(
                "expected {} alpha values, found {}",
                self.num_svs,
                self.alpha.len()
            )));
        }
        if self.svs.len() != self.num_svs {
            return Err(SVMError::MalformedModel(format!(
                "expected {} support vector indices, found {}",
                self.num_svs,
                self.svs.len()
            )));
        }
        self.check_finite()
    }

    /// JSON has no NaN or infinity, so such values would not load back
    fn check_finite(&self) -> Result<()> {
        let params = &self.params;
        let mut scalars = vec![
            ("bias", self.bias),
            ("objective", self.objective),
            ("nu", params.nu),
            ("c1", params.c1),
            ("c2", params.c2),
            ("weight_epsilon", params.weight_epsilon),
            ("epsilon", params.epsilon),
            ("tube_epsilon", params.tube_epsilon),
            ("c_mkl", params.c_mkl),
            ("max_train_time", params.max_train_time),
        ];
        if let KernelParams::WeightedDegreeRbf { width, .. } = self.kernel {
            scalars.push(("kernel width", width));
        }
        if let Some((name, value)) = scalars.iter().find(|(_, value)| !value.is_finite()) {
            return Err(SVMError::MalformedModel(format!(
                "{name} must be finite, got {value}"
            )));
        }
        if let Some(idx) = self.alpha.iter().position(|a| !a.is_finite()) {
            return Err(SVMError::MalformedModel(format!(
                "alpha[{}] must be finite, got {}",
                idx, self.alpha[idx]
            )));
        }
        Ok(())
    }

    /// Rebuild the support vector model
    pub fn to_model(&self) -> Result<SupportVectorModel> {
        self.validate()?;
        SupportVectorModel::from_parts(self.bias, self.alpha.clone(), self.svs.clone())
    }

    /// Validate and write the model as JSON
    pub fn save_to_writer<W: Write>(&self, writer: W) -> Result<()> {
        self.validate()?;
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))
    }

    /// Parse and validate a model document
    pub fn load_from_reader<R: Read>(reader: R) -> Result<Self> {
        let model: Self = serde_json::from_reader(reader)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;
        let file = File::create(path).map_err(SVMError::IoError)?;
        let mut writer = BufWriter::new(file);
        self.save_to_writer(&mut writer)?;
        writer.flush().map_err(SVMError::IoError)
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        Self::load_from_reader(BufReader::new(file))
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== SVM Model Summary ===");
        match &self.kernel {
            KernelParams::Linear => println!("Kernel Type: linear"),
            KernelParams::WeightedDegreeRbf {
                width,
                degree,
                nof_properties,
            } => {
                println!("Kernel Type: weighted_degree_rbf");
                println!("  Width: {width}");
                println!("  Degree: {degree}");
                println!("  Properties per block: {nof_properties}");
            }
        }
        println!("Support Vectors: {}", self.num_svs);
        println!("Bias: {:.6}", self.bias);
        println!("Objective: {:.6}", self.objective);
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
        println!("Hyperparameters:");
        println!("  C1: {}  C2: {}", self.params.c1, self.params.c2);
        println!("  nu: {}", self.params.nu);
        println!(
            "  epsilon: {}  weight_epsilon: {}  tube_epsilon: {}",
            self.params.epsilon, self.params.weight_epsilon, self.params.tube_epsilon
        );
        println!("  C_mkl: {}  qpsize: {}", self.params.c_mkl, self.params.qpsize);
        println!("  max_train_time: {}", self.params.max_train_time);
        println!(
            "  shrinking: {}  mkl: {}  batch: {}  linadd: {}  precomputed_subkernels: {}",
            self.params.shrinking_enabled,
            self.params.mkl_enabled,
            self.params.batch_computation_enabled,
            self.params.linadd_enabled,
            self.params.precomputed_subkernels_enabled
        );
    }
}

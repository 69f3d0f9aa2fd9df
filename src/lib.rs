//! Support vector machine inference core
//!
//! Evaluates trained kernel classifiers: a decision value is the bias plus the
//! alpha-weighted kernel similarity between an example and every support
//! vector. Ships a weighted-degree RBF kernel for positional feature vectors.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod kernel;
pub mod machine;
pub mod model;
pub mod persistence;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, SVM};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{Result, SVMError};
pub use crate::data::CSVDataset;
pub use crate::kernel::{
    AdditiveKernel, Kernel, KernelParams, LinearKernel, WeightedDegreeRBFKernel,
};
pub use crate::machine::{ClassifyTask, KernelMachine, KernelOptimization};
pub use crate::model::SupportVectorModel;
pub use crate::persistence::SerializableModel;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for the SVM inference core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Failed to allocate storage for {requested} elements")]
    AllocationFailed { requested: usize },

    #[error("No training features attached to the kernel machine")]
    NoTrainingFeatures,

    #[error("No test features attached to the kernel machine")]
    NoTestFeatures,

    #[error("Malformed model: {0}")]
    MalformedModel(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, SVMError>;

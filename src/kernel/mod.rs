//! Kernel functions for SVM

pub mod linear;
pub mod traits;
pub mod weighted_degree_rbf;

pub use self::linear::*;
pub use self::traits::*;
pub use self::weighted_degree_rbf::*;

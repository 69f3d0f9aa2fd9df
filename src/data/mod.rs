//! Feature set loading

pub mod csv;

pub use self::csv::*;

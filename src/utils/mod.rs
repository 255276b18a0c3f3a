//! Preprocessing and validation helpers

pub mod preprocessing;
pub mod validation;

pub use preprocessing::ImagePreprocessor;
pub use validation::ConfigValidator;

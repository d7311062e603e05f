//! Preprocessing pipeline composition and execution.

mod runner;

pub use runner::{
    preprocess, preprocess_with, FilterConfig, NormalizationConfig, PreprocessConfig,
};

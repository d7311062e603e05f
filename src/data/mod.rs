//! Core data structures for preprocessing.

mod dataset_config;
mod expression_matrix;

pub use dataset_config::{DatasetConfig, DEFAULT_N_CLUSTERS};
pub use expression_matrix::ExpressionMatrix;

//! Compressed matrix artifact naming and persistence.
//!
//! Collaborators persist intermediate and final matrices as gzip-compressed
//! delimited text, keyed by `{normalization_method}_{stage}_{algorithm}`.

use crate::data::ExpressionMatrix;
use crate::error::Result;
use crate::normalize::NormalizationMethod;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Pipeline stage an artifact was captured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Filtered,
    Normalized,
    Reduced,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Filtered => write!(f, "filtered"),
            PipelineStage::Normalized => write!(f, "normalized"),
            PipelineStage::Reduced => write!(f, "reduced"),
        }
    }
}

/// File name for an artifact: `{method}_{stage}_{algorithm}.csv.gz`.
pub fn artifact_filename(
    method: NormalizationMethod,
    stage: PipelineStage,
    algorithm: &str,
) -> String {
    format!("{}_{}_{}.csv.gz", method, stage, algorithm)
}

/// Write a matrix artifact (gzip decided by the path's extension).
pub fn save_matrix<P: AsRef<Path>>(matrix: &ExpressionMatrix, path: P) -> Result<()> {
    matrix.to_path(path)
}

/// Load a matrix artifact; a missing path fails with the expected path.
pub fn load_matrix<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    ExpressionMatrix::from_path(path)
}

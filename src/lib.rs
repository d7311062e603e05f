//! Single-cell expression matrix preprocessing.
//!
//! This library prepares cells×genes count matrices for clustering: it
//! removes low-quality genes and cells, normalizes counts to a comparable
//! scale, and reduces dimensionality before a pluggable clustering step.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (ExpressionMatrix, DatasetConfig)
//! - **genes**: Marker gene sets (mitochondrial, apoptosis, rRNA) per species
//! - **filter**: Gene and cell quality filters (magnitude, fraction-based)
//! - **normalize**: Normalization branches (library size + log, Pearson residuals)
//! - **reduce**: Dimensionality reduction (PCA)
//! - **cluster**: Clustering strategy interface consumed by collaborators
//! - **pipeline**: Preprocessing pipeline composition and execution
//! - **artifacts**: Compressed matrix artifact naming and persistence
//!
//! # Example
//!
//! ```no_run
//! use cellprep::prelude::*;
//!
//! let raw = ExpressionMatrix::from_path("counts.csv.gz").unwrap();
//!
//! let config = PreprocessConfig {
//!     method: NormalizationMethod::LogCpm,
//!     n_pca_components: 50,
//!     ..PreprocessConfig::default()
//! };
//!
//! let reduced = preprocess(&raw, &config).unwrap();
//! ```

pub mod artifacts;
pub mod cluster;
pub mod data;
pub mod error;
pub mod filter;
pub mod genes;
pub mod normalize;
pub mod pipeline;
pub mod reduce;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::artifacts::{artifact_filename, load_matrix, save_matrix, PipelineStage};
    pub use crate::cluster::{ClusterParams, ClusteringStrategy, StrategyRegistry};
    pub use crate::data::{DatasetConfig, ExpressionMatrix};
    pub use crate::error::{PrepError, Result};
    pub use crate::filter::{
        filter_by_fraction, filter_by_fraction_with_stats, filter_low_magnitude, CutoffMode,
        FractionFilterResult,
    };
    pub use crate::genes::{GeneCategory, GeneSet, GeneSetCatalog, Species};
    pub use crate::normalize::{
        log_transform, normalize_by_library_size, normalize_pearson, NormalizationMethod,
    };
    pub use crate::pipeline::{
        preprocess, preprocess_with, FilterConfig, NormalizationConfig, PreprocessConfig,
    };
    pub use crate::reduce::{apply_pca, fit_pca, PcaFit};
}

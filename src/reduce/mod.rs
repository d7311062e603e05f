//! Dimensionality reduction.

mod pca;

pub use pca::{apply_pca, fit_pca, PcaFit};

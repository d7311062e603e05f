//! Magnitude-based gene filtering.

use crate::data::ExpressionMatrix;
use crate::error::Result;

/// Drop genes that never reach `min_count` in any cell.
///
/// With the default threshold of 2 this removes genes containing only 0s
/// and 1s, which carry no usable signal for clustering.
///
/// # Arguments
/// * `matrix` - The expression matrix to filter
/// * `min_count` - A gene is kept iff at least one cell has a value >= this
///
/// # Returns
/// A new matrix containing only the surviving genes, column order
/// preserved. An all-genes-dropped result is legal and propagates.
pub fn filter_low_magnitude(matrix: &ExpressionMatrix, min_count: f64) -> Result<ExpressionMatrix> {
    let col_max = matrix.col_max();

    let keep_indices: Vec<usize> = col_max
        .iter()
        .enumerate()
        .filter(|(_, &max)| max >= min_count)
        .map(|(i, _)| i)
        .collect();

    let dropped = matrix.n_genes() - keep_indices.len();
    log::info!(
        "[filter magnitude] dropped {} genes with max count < {}",
        dropped,
        min_count
    );

    matrix.subset_genes(&keep_indices)
}

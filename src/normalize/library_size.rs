//! Library-size normalization.

use crate::data::ExpressionMatrix;
use crate::error::{PrepError, Result};

/// Counts-per-million rescale target.
pub const CPM_RESCALE: f64 = 1_000_000.0;

/// Rescale each cell's counts to sum to `rescale`.
///
/// Per cell, every gene value is divided by the cell's total count and
/// multiplied by `rescale` (1e6 gives CPM). A cell with total count 0
/// yields an all-zero row rather than NaNs; the row count is preserved.
///
/// For every output row with nonzero input total, the row sum equals
/// `rescale` up to floating-point tolerance.
pub fn normalize_by_library_size(
    matrix: &ExpressionMatrix,
    rescale: f64,
) -> Result<ExpressionMatrix> {
    if rescale <= 0.0 {
        return Err(PrepError::InvalidParameter(
            "Rescale target must be positive".to_string(),
        ));
    }

    let totals = matrix.row_sums();

    // A zero total would divide to NaN; scaling by 0 instead leaves the
    // (already all-zero) row at zero.
    let factors: Vec<f64> = totals
        .iter()
        .map(|&t| if t == 0.0 { 0.0 } else { rescale / t })
        .collect();

    log::info!(
        "[normalize] library size rescale to {:.0e} across {} cells",
        rescale,
        matrix.n_cells()
    );

    matrix.scale_rows(&factors)
}

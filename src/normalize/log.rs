//! Elementwise log transform.

use crate::data::ExpressionMatrix;
use crate::error::{PrepError, Result};

/// Apply log10(x + pseudocount) elementwise.
///
/// A zero input maps to log10(pseudocount); with the default pseudocount of
/// 1 this is exactly 0, so sparse backing is preserved in that case.
pub fn log_transform(matrix: &ExpressionMatrix, pseudocount: f64) -> Result<ExpressionMatrix> {
    if pseudocount <= 0.0 {
        return Err(PrepError::InvalidParameter(
            "Pseudocount must be positive".to_string(),
        ));
    }

    log::info!("[transform] log10(x + {})", pseudocount);

    Ok(matrix.map_values(|v| (v + pseudocount).log10()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sprs::TriMat;

    fn create_test_matrix() -> ExpressionMatrix {
        let mut tri = TriMat::new((2, 3));
        tri.add_triplet(0, 0, 50.0);
        tri.add_triplet(0, 1, 50.0);
        tri.add_triplet(1, 0, 50.0);
        tri.add_triplet(1, 1, 150.0);
        // gene 2 stays all-zero

        let cell_ids = vec!["Cell_1".into(), "Cell_2".into()];
        let gene_ids = vec!["Gene_A".into(), "Gene_B".into(), "Gene_Zero".into()];
        ExpressionMatrix::from_sparse(tri.to_csr(), cell_ids, gene_ids).unwrap()
    }

    #[test]
    fn test_log_values() {
        let mat = create_test_matrix();
        let logged = log_transform(&mat, 1.0).unwrap();

        assert_relative_eq!(logged.get(0, 0), 51.0_f64.log10(), epsilon = 1e-12);
        assert_relative_eq!(logged.get(1, 1), 151.0_f64.log10(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_column_stays_zero_with_unit_pseudocount() {
        let mat = create_test_matrix();
        let logged = log_transform(&mat, 1.0).unwrap();

        assert_eq!(logged.get(0, 2), 0.0);
        assert_eq!(logged.get(1, 2), 0.0);
        assert!(logged.is_sparse());
    }

    #[test]
    fn test_non_unit_pseudocount_shifts_zeros() {
        let mat = create_test_matrix();
        let logged = log_transform(&mat, 10.0).unwrap();

        assert_relative_eq!(logged.get(0, 2), 1.0, epsilon = 1e-12);
        assert!(!logged.is_sparse());
    }

    #[test]
    fn test_invalid_pseudocount() {
        let mat = create_test_matrix();
        assert!(log_transform(&mat, 0.0).is_err());
        assert!(log_transform(&mat, -1.0).is_err());
    }
}

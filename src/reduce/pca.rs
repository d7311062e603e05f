//! Principal component analysis via exact SVD.

use crate::data::ExpressionMatrix;
use crate::error::{PrepError, Result};
use nalgebra::DMatrix;

/// A fitted PCA projection.
#[derive(Debug, Clone)]
pub struct PcaFit {
    /// Projected scores (cells × components).
    pub scores: DMatrix<f64>,
    /// Fraction of total variance explained by each retained component,
    /// in descending order.
    pub explained_variance_ratio: Vec<f64>,
    cell_ids: Vec<String>,
}

impl PcaFit {
    /// Number of retained components.
    pub fn n_components(&self) -> usize {
        self.scores.ncols()
    }

    /// Total fraction of variance explained by the retained components.
    pub fn total_explained_variance(&self) -> f64 {
        self.explained_variance_ratio.iter().sum()
    }

    /// Convert the scores into an expression matrix with columns PC1..PCk.
    pub fn into_matrix(self) -> Result<ExpressionMatrix> {
        let gene_ids: Vec<String> = (1..=self.scores.ncols())
            .map(|i| format!("PC{}", i))
            .collect();
        ExpressionMatrix::from_dense(self.scores, self.cell_ids, gene_ids)
    }
}

/// Fit a PCA projection of `matrix` onto `n_components` components.
///
/// Columns are mean-centered and the centered matrix is decomposed with an
/// exact SVD, so the result is fully deterministic. Components are ordered
/// by descending explained variance; each component's sign is fixed so that
/// its largest-magnitude loading is positive.
///
/// `n_components` greater than min(n_cells, n_genes) is clamped with a
/// warning.
pub fn fit_pca(matrix: &ExpressionMatrix, n_components: usize) -> Result<PcaFit> {
    if n_components == 0 {
        return Err(PrepError::InvalidParameter(
            "n_components must be at least 1".to_string(),
        ));
    }
    let n_cells = matrix.n_cells();
    let n_genes = matrix.n_genes();
    if n_cells == 0 || n_genes == 0 {
        return Err(PrepError::EmptyData(
            "Cannot fit PCA on an empty matrix".to_string(),
        ));
    }

    let min_dim = n_cells.min(n_genes);
    let n_components = if n_components > min_dim {
        log::warn!(
            "matrix shape ({}, {}) < requested components {}, reducing to {}",
            n_cells,
            n_genes,
            n_components,
            min_dim
        );
        min_dim
    } else {
        n_components
    };

    // Mean-center each gene column.
    let mut centered = matrix.to_dense();
    for gene in 0..n_genes {
        let mean = centered.column(gene).iter().sum::<f64>() / n_cells as f64;
        for cell in 0..n_cells {
            centered[(cell, gene)] -= mean;
        }
    }

    let svd = centered.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| PrepError::Numerical("SVD did not produce U".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| PrepError::Numerical("SVD did not produce V^T".to_string()))?;
    let singular_values = svd.singular_values;

    // Singular value order is not guaranteed; rank components by descending
    // explained variance explicitly.
    let mut order: Vec<usize> = (0..singular_values.len()).collect();
    order.sort_by(|&a, &b| {
        singular_values[b]
            .partial_cmp(&singular_values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total_variance: f64 = singular_values.iter().map(|s| s * s).sum();

    let mut scores = DMatrix::zeros(n_cells, n_components);
    let mut explained_variance_ratio = Vec::with_capacity(n_components);

    for (rank, &comp) in order.iter().take(n_components).enumerate() {
        let s = singular_values[comp];

        // Fix the sign so the largest-magnitude loading is positive.
        let loading = v_t.row(comp);
        let flip = loading
            .iter()
            .cloned()
            .max_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(std::cmp::Ordering::Equal))
            .map(|extreme| extreme < 0.0)
            .unwrap_or(false);
        let sign = if flip { -1.0 } else { 1.0 };

        for cell in 0..n_cells {
            scores[(cell, rank)] = sign * u[(cell, comp)] * s;
        }

        explained_variance_ratio.push(if total_variance > 0.0 {
            s * s / total_variance
        } else {
            0.0
        });
    }

    Ok(PcaFit {
        scores,
        explained_variance_ratio,
        cell_ids: matrix.cell_ids().to_vec(),
    })
}

/// Project `matrix` onto `n_components` principal components.
///
/// Reports the total explained-variance fraction via the log facade; the
/// returned matrix carries only the scores.
pub fn apply_pca(matrix: &ExpressionMatrix, n_components: usize) -> Result<ExpressionMatrix> {
    let fit = fit_pca(matrix, n_components)?;
    log::info!(
        "[pca] {} components explain {:.1}% of variance",
        fit.n_components(),
        fit.total_explained_variance() * 100.0
    );
    fit.into_matrix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sprs::TriMat;

    /// 4 cells spread along a single direction in gene space.
    fn create_line_matrix() -> ExpressionMatrix {
        let mut tri = TriMat::new((4, 3));
        for (cell, &scale) in [1.0, 2.0, 3.0, 4.0].iter().enumerate() {
            tri.add_triplet(cell, 0, 2.0 * scale);
            tri.add_triplet(cell, 1, 1.0 * scale);
            tri.add_triplet(cell, 2, 3.0 * scale);
        }
        let cell_ids = (0..4).map(|i| format!("Cell_{}", i)).collect();
        let gene_ids = vec!["g1".into(), "g2".into(), "g3".into()];
        ExpressionMatrix::from_sparse(tri.to_csr(), cell_ids, gene_ids).unwrap()
    }

    #[test]
    fn test_output_shape_and_names() {
        let mat = create_line_matrix();
        let reduced = apply_pca(&mat, 2).unwrap();

        assert_eq!(reduced.n_cells(), 4);
        assert_eq!(reduced.n_genes(), 2);
        assert_eq!(reduced.gene_ids(), &["PC1", "PC2"]);
        assert_eq!(reduced.cell_ids(), mat.cell_ids());
    }

    #[test]
    fn test_rank_one_data_explained_by_first_component() {
        let mat = create_line_matrix();
        let fit = fit_pca(&mat, 2).unwrap();

        assert_relative_eq!(fit.explained_variance_ratio[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(fit.explained_variance_ratio[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(fit.total_explained_variance(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_components_ordered_by_variance() {
        // Two independent directions with very different spreads.
        let mut tri = TriMat::new((4, 2));
        tri.add_triplet(0, 0, 0.0);
        tri.add_triplet(1, 0, 100.0);
        tri.add_triplet(2, 0, 0.0);
        tri.add_triplet(3, 0, 100.0);
        tri.add_triplet(0, 1, 0.0);
        tri.add_triplet(1, 1, 0.0);
        tri.add_triplet(2, 1, 1.0);
        tri.add_triplet(3, 1, 1.0);
        let mat = ExpressionMatrix::from_sparse(
            tri.to_csr(),
            (0..4).map(|i| format!("c{}", i)).collect(),
            vec!["wide".into(), "narrow".into()],
        )
        .unwrap();

        let fit = fit_pca(&mat, 2).unwrap();
        assert!(fit.explained_variance_ratio[0] > fit.explained_variance_ratio[1]);
        assert!(fit.explained_variance_ratio[0] > 0.99);
    }

    #[test]
    fn test_deterministic() {
        let mat = create_line_matrix();
        let a = fit_pca(&mat, 2).unwrap();
        let b = fit_pca(&mat, 2).unwrap();
        assert_eq!(a.scores, b.scores);
    }

    #[test]
    fn test_sign_convention_positive_dominant_loading() {
        let mat = create_line_matrix();
        let fit = fit_pca(&mat, 1).unwrap();
        // With the dominant loading positive, scores increase along the
        // gradient from Cell_0 (smallest) to Cell_3 (largest).
        assert!(fit.scores[(3, 0)] > fit.scores[(0, 0)]);
    }

    #[test]
    fn test_clamps_excess_components() {
        let mat = create_line_matrix();
        let reduced = apply_pca(&mat, 50).unwrap();
        // min(4 cells, 3 genes) = 3
        assert_eq!(reduced.n_genes(), 3);
    }

    #[test]
    fn test_zero_components_rejected() {
        let mat = create_line_matrix();
        assert!(matches!(
            apply_pca(&mat, 0),
            Err(PrepError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_constant_matrix_yields_zero_scores() {
        let mut tri = TriMat::new((3, 2));
        for cell in 0..3 {
            tri.add_triplet(cell, 0, 7.0);
            tri.add_triplet(cell, 1, 7.0);
        }
        let mat = ExpressionMatrix::from_sparse(
            tri.to_csr(),
            (0..3).map(|i| format!("c{}", i)).collect(),
            vec!["g1".into(), "g2".into()],
        )
        .unwrap();

        let fit = fit_pca(&mat, 1).unwrap();
        for cell in 0..3 {
            assert_relative_eq!(fit.scores[(cell, 0)], 0.0, epsilon = 1e-9);
        }
        assert_eq!(fit.explained_variance_ratio[0], 0.0);
    }
}

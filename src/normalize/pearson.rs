//! Negative-binomial Pearson residual normalization.
//!
//! Replaces raw counts with residuals from a fitted mean-variance model:
//! the expected count for cell c and gene g under the null model is
//! `mu_cg = cell_total_c * gene_total_g / grand_total`, the variance is
//! NB-like (`mu + mu^2/theta`) with a per-gene overdispersion theta, and
//! the residual is `(x - mu) / sqrt(mu + mu^2/theta)`. Residuals are
//! clipped to +/- sqrt(n_cells) to bound outlier influence, then genes are
//! ranked by residual variance and only the top `n_hvg` are retained.
//!
//! This branch replaces library-size normalization entirely; the two are
//! never combined.

use crate::data::ExpressionMatrix;
use crate::error::{PrepError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Dispersion fallback when no overdispersion is detected (approaches
/// Poisson behavior).
const MAX_THETA: f64 = 1e6;

/// Compute clipped NB Pearson residuals and subset to the `n_hvg` most
/// variable genes.
///
/// Returns a dense matrix of residual values over the retained genes,
/// original column order preserved. When the matrix has fewer than `n_hvg`
/// genes all of them are kept.
pub fn normalize_pearson(matrix: &ExpressionMatrix, n_hvg: usize) -> Result<ExpressionMatrix> {
    if n_hvg == 0 {
        return Err(PrepError::InvalidParameter(
            "n_hvg must be at least 1".to_string(),
        ));
    }

    let n_cells = matrix.n_cells();
    let n_genes = matrix.n_genes();
    if n_cells == 0 || n_genes == 0 {
        return Err(PrepError::EmptyData(
            "Cannot compute residuals on an empty matrix".to_string(),
        ));
    }

    let cell_totals = matrix.row_sums();
    let gene_totals = matrix.col_sums();
    let grand_total: f64 = cell_totals.iter().sum();
    if grand_total == 0.0 {
        return Err(PrepError::EmptyData(
            "All counts are zero, residual model is undefined".to_string(),
        ));
    }

    log::info!(
        "[residuals] fitting NB Pearson residuals for {} cells x {} genes",
        n_cells,
        n_genes
    );

    let clip = (n_cells as f64).sqrt();

    // Per-gene: estimate dispersion, compute the clipped residual column
    // and its variance.
    let columns: Vec<(Vec<f64>, f64)> = (0..n_genes)
        .into_par_iter()
        .map(|gene| {
            let observed: Vec<f64> = (0..n_cells).map(|cell| matrix.get(cell, gene)).collect();
            let expected: Vec<f64> = (0..n_cells)
                .map(|cell| cell_totals[cell] * gene_totals[gene] / grand_total)
                .collect();

            let theta = estimate_dispersion(&observed, &expected);

            let residuals: Vec<f64> = observed
                .iter()
                .zip(expected.iter())
                .map(|(&x, &mu)| {
                    if mu == 0.0 {
                        // mu = 0 forces x = 0; the residual is defined as 0.
                        0.0
                    } else {
                        let r = (x - mu) / (mu + mu * mu / theta).sqrt();
                        r.clamp(-clip, clip)
                    }
                })
                .collect();

            let mean = residuals.iter().sum::<f64>() / n_cells as f64;
            let variance = residuals
                .iter()
                .map(|r| (r - mean) * (r - mean))
                .sum::<f64>()
                / n_cells as f64;

            (residuals, variance)
        })
        .collect();

    // Rank genes by residual variance and keep the top n_hvg, restoring
    // original column order for the survivors.
    let mut ranked: Vec<usize> = (0..n_genes).collect();
    ranked.sort_by(|&a, &b| {
        columns[b]
            .1
            .partial_cmp(&columns[a].1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut keep: Vec<usize> = ranked.into_iter().take(n_hvg).collect();
    keep.sort_unstable();

    log::info!(
        "[residuals] retaining {} of {} genes by residual variance",
        keep.len(),
        n_genes
    );

    let mut data = DMatrix::zeros(n_cells, keep.len());
    for (new_col, &gene) in keep.iter().enumerate() {
        for cell in 0..n_cells {
            data[(cell, new_col)] = columns[gene].0[cell];
        }
    }
    let gene_ids: Vec<String> = keep
        .iter()
        .map(|&g| matrix.gene_ids()[g].clone())
        .collect();

    ExpressionMatrix::from_dense(data, matrix.cell_ids().to_vec(), gene_ids)
}

/// Estimate per-gene NB dispersion via method of moments.
///
/// Under the NB model the Poisson Pearson chi-square exceeds the cell count
/// by roughly n/theta, so theta = n / (chi^2 - n). Non-positive excess
/// means no detectable overdispersion and falls back to [`MAX_THETA`].
fn estimate_dispersion(observed: &[f64], expected: &[f64]) -> f64 {
    let n = observed.len() as f64;

    let chi_sq: f64 = observed
        .iter()
        .zip(expected.iter())
        .filter(|(_, &mu)| mu > 0.0)
        .map(|(&x, &mu)| {
            let resid = x - mu;
            resid * resid / mu
        })
        .sum();

    let excess = chi_sq - n;
    if excess > 0.0 {
        n / excess
    } else {
        MAX_THETA
    }
}

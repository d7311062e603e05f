//! Fraction-based cell filtering against marker gene sets.
//!
//! Cells whose counts are dominated by a marker subset (mitochondrial,
//! apoptosis, rRNA) are low quality: dying, stressed, or technically noisy.
//! The filter drops cells where the subset's share of total counts exceeds
//! a cutoff.

use crate::data::ExpressionMatrix;
use crate::error::{PrepError, Result};
use crate::genes::GeneSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Cutoff policy for fraction filtering.
///
/// The two modes are not interchangeable: a fixed threshold is absolute,
/// while a percentile cutoff is computed from the ratio distribution of the
/// dataset at hand. The pipeline variant in use determines which applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffMode {
    /// Keep cells with ratio <= the given fraction (in [0, 1]).
    Fixed(f64),
    /// Keep cells with ratio strictly less than the P-th percentile of the
    /// ratio distribution (P in [0, 100]).
    Percentile(f64),
}

/// Statistics from one fraction-filter application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FractionFilterResult {
    /// Number of cells before filtering.
    pub n_before: usize,
    /// Number of cells after filtering.
    pub n_after: usize,
    /// Number of cells removed.
    pub n_removed: usize,
    /// IDs of removed cells.
    pub removed_cells: Vec<String>,
    /// Number of matrix genes that matched the gene set.
    pub n_matched_genes: usize,
    /// The cutoff value the filter applied (resolved for percentile mode).
    pub cutoff: f64,
    /// Whether the stage was skipped because no genes matched.
    pub skipped: bool,
}

impl std::fmt::Display for FractionFilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Fraction Filter Result")?;
        if self.skipped {
            writeln!(f, "  Skipped: no marker genes in dataset")?;
            return Ok(());
        }
        writeln!(f, "  Matched genes:  {}", self.n_matched_genes)?;
        writeln!(f, "  Cutoff:         {:.4}", self.cutoff)?;
        writeln!(f, "  Cells before:   {}", self.n_before)?;
        writeln!(f, "  Cells after:    {}", self.n_after)?;
        writeln!(f, "  Cells removed:  {}", self.n_removed)?;
        Ok(())
    }
}

/// Drop cells where `gene_set`'s share of total counts exceeds the cutoff.
///
/// When no genes of the set are present in the matrix columns the stage
/// warns and returns the input unchanged (skip, not fail). A cell with
/// total count 0 gets ratio 0 (the zero total is replaced by 1 before
/// dividing) and is never the source of a NaN.
pub fn filter_by_fraction(
    matrix: &ExpressionMatrix,
    gene_set: &GeneSet,
    mode: CutoffMode,
) -> Result<ExpressionMatrix> {
    let (filtered, _) = filter_by_fraction_with_stats(matrix, gene_set, mode)?;
    Ok(filtered)
}

/// Like [`filter_by_fraction`], also returning filter statistics.
pub fn filter_by_fraction_with_stats(
    matrix: &ExpressionMatrix,
    gene_set: &GeneSet,
    mode: CutoffMode,
) -> Result<(ExpressionMatrix, FractionFilterResult)> {
    validate_mode(mode)?;

    let subset = gene_set.resolve(matrix.gene_ids());
    if subset.is_empty() {
        log::warn!(
            "[filter {}] no marker genes found in dataset, skipping",
            gene_set.category()
        );
        let stats = FractionFilterResult {
            n_before: matrix.n_cells(),
            n_after: matrix.n_cells(),
            n_removed: 0,
            removed_cells: Vec::new(),
            n_matched_genes: 0,
            cutoff: f64::NAN,
            skipped: true,
        };
        return Ok((matrix.clone(), stats));
    }

    let ratios = expression_ratios(matrix, &subset);

    let (cutoff, keep_indices): (f64, Vec<usize>) = match mode {
        CutoffMode::Fixed(threshold) => {
            let keep = ratios
                .iter()
                .enumerate()
                .filter(|(_, &r)| r <= threshold)
                .map(|(i, _)| i)
                .collect();
            (threshold, keep)
        }
        CutoffMode::Percentile(p) => {
            let cutoff = percentile(&ratios, p);
            let keep = ratios
                .iter()
                .enumerate()
                .filter(|(_, &r)| r < cutoff)
                .map(|(i, _)| i)
                .collect();
            (cutoff, keep)
        }
    };

    let removed_cells: Vec<String> = {
        let keep: std::collections::HashSet<usize> = keep_indices.iter().copied().collect();
        matrix
            .cell_ids()
            .iter()
            .enumerate()
            .filter(|(i, _)| !keep.contains(i))
            .map(|(_, id)| id.clone())
            .collect()
    };

    log::info!(
        "[filter {}] dropped {} of {} cells (cutoff {:.4}, {} marker genes)",
        gene_set.category(),
        removed_cells.len(),
        matrix.n_cells(),
        cutoff,
        subset.len()
    );

    let stats = FractionFilterResult {
        n_before: matrix.n_cells(),
        n_after: keep_indices.len(),
        n_removed: removed_cells.len(),
        removed_cells,
        n_matched_genes: subset.len(),
        cutoff,
        skipped: false,
    };

    let filtered = matrix.subset_cells(&keep_indices)?;
    Ok((filtered, stats))
}

fn validate_mode(mode: CutoffMode) -> Result<()> {
    match mode {
        CutoffMode::Fixed(t) if !(0.0..=1.0).contains(&t) => Err(PrepError::InvalidParameter(
            format!("Fraction cutoff must be in [0, 1], got {}", t),
        )),
        CutoffMode::Percentile(p) if !(0.0..=100.0).contains(&p) => Err(
            PrepError::InvalidParameter(format!("Percentile must be in [0, 100], got {}", p)),
        ),
        _ => Ok(()),
    }
}

/// Per-cell subset_sum / total_sum with a zero total replaced by 1.
fn expression_ratios(matrix: &ExpressionMatrix, subset: &[usize]) -> Vec<f64> {
    let totals = matrix.row_sums();
    (0..matrix.n_cells())
        .into_par_iter()
        .map(|cell| {
            let subset_sum: f64 = subset.iter().map(|&g| matrix.get(cell, g)).sum();
            let total = if totals[cell] == 0.0 { 1.0 } else { totals[cell] };
            subset_sum / total
        })
        .collect()
}

/// Linear-interpolation percentile over an unsorted slice.
///
/// Matches the standard definition: with the values sorted ascending, the
/// P-th percentile sits at rank p/100 * (n-1), interpolating between the
/// two bracketing order statistics.
fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + frac * (sorted[upper] - sorted[lower])
}

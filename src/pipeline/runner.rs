//! Pipeline runner sequencing the preprocessing stages.
//!
//! Stages run strictly in order: RAW → FILTERED → NORMALIZED → REDUCED.
//! Filtering applies magnitude → apoptosis → rRNA → mitochondrial, with the
//! mitochondrial filter last so that dead-cell removal happens after other
//! outliers are pruned and before library sizes are computed. Normalization
//! then takes exactly one of the two branches, and PCA finishes the run.

use crate::data::ExpressionMatrix;
use crate::error::Result;
use crate::filter::{filter_by_fraction, filter_low_magnitude, CutoffMode};
use crate::genes::{GeneCategory, GeneSetCatalog, Species};
use crate::normalize::{
    log_transform, normalize_by_library_size, normalize_pearson, NormalizationMethod, CPM_RESCALE,
};
use crate::reduce::apply_pca;
use serde::{Deserialize, Serialize};

/// Thresholds consumed by the filtering stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Minimum column max for a gene to survive the magnitude filter.
    pub min_count: f64,
    /// Cutoff for the apoptosis fraction filter.
    pub apoptosis_cutoff: CutoffMode,
    /// Cutoff for the rRNA fraction filter.
    pub rrna_cutoff: CutoffMode,
    /// Cutoff for the mitochondrial fraction filter.
    pub mito_cutoff: CutoffMode,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_count: 2.0,
            apoptosis_cutoff: CutoffMode::Fixed(0.05),
            rrna_cutoff: CutoffMode::Fixed(0.05),
            mito_cutoff: CutoffMode::Fixed(0.05),
        }
    }
}

/// Parameters consumed by the normalization stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// Library-size rescale target (log-CPM branch).
    pub rescale: f64,
    /// Log pseudocount (log-CPM branch).
    pub pseudocount: f64,
    /// Number of highly variable genes to retain (Pearson branch).
    pub n_hvg: usize,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            rescale: CPM_RESCALE,
            pseudocount: 1.0,
            n_hvg: 3000,
        }
    }
}

/// Full configuration for one preprocessing run.
///
/// Threaded explicitly through every call; there is no module-level state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Which normalization branch to take.
    pub method: NormalizationMethod,
    /// Species selecting the marker gene catalog.
    pub species: Species,
    /// Filtering thresholds.
    pub filter: FilterConfig,
    /// Normalization parameters.
    pub normalize: NormalizationConfig,
    /// Number of PCA components to retain.
    pub n_pca_components: usize,
    /// Seed threaded to randomized collaborators (the exact PCA solver
    /// itself is deterministic).
    pub seed: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            method: NormalizationMethod::PearsonResiduals,
            species: Species::Human,
            filter: FilterConfig::default(),
            normalize: NormalizationConfig::default(),
            n_pca_components: 50,
            seed: 42,
        }
    }
}

/// Run the full preprocessing pipeline: filter, normalize, reduce.
///
/// Each stage fully materializes its output before the next begins, and no
/// stage mutates its input. A failure in any stage aborts the whole run.
pub fn preprocess(raw: &ExpressionMatrix, config: &PreprocessConfig) -> Result<ExpressionMatrix> {
    log::info!(
        "preprocessing {} cells x {} genes (method={}, species={})",
        raw.n_cells(),
        raw.n_genes(),
        config.method,
        config.species
    );

    let filtered = filter_stage(raw, config)?;
    let normalized = normalize_stage(&filtered, config)?;
    let reduced = apply_pca(&normalized, config.n_pca_components)?;

    log::info!(
        "preprocessing finished: {} cells x {} components",
        reduced.n_cells(),
        reduced.n_genes()
    );
    Ok(reduced)
}

/// Convenience entry point with default thresholds.
pub fn preprocess_with(
    raw: &ExpressionMatrix,
    method: NormalizationMethod,
    species: Species,
    n_pca_components: usize,
) -> Result<ExpressionMatrix> {
    let config = PreprocessConfig {
        method,
        species,
        n_pca_components,
        ..PreprocessConfig::default()
    };
    preprocess(raw, &config)
}

/// RAW → FILTERED: magnitude, then apoptosis, rRNA, mitochondrial fractions.
fn filter_stage(raw: &ExpressionMatrix, config: &PreprocessConfig) -> Result<ExpressionMatrix> {
    let catalog = |category| GeneSetCatalog::get(config.species, category);

    let data = filter_low_magnitude(raw, config.filter.min_count)?;
    let data = filter_by_fraction(
        &data,
        &catalog(GeneCategory::Apoptosis),
        config.filter.apoptosis_cutoff,
    )?;
    let data = filter_by_fraction(
        &data,
        &catalog(GeneCategory::Rrna),
        config.filter.rrna_cutoff,
    )?;
    filter_by_fraction(
        &data,
        &catalog(GeneCategory::Mitochondrial),
        config.filter.mito_cutoff,
    )
}

/// FILTERED → NORMALIZED: exactly one of the two branches.
fn normalize_stage(
    filtered: &ExpressionMatrix,
    config: &PreprocessConfig,
) -> Result<ExpressionMatrix> {
    match config.method {
        NormalizationMethod::LogCpm => {
            let scaled = normalize_by_library_size(filtered, config.normalize.rescale)?;
            log_transform(&scaled, config.normalize.pseudocount)
        }
        NormalizationMethod::PearsonResiduals => {
            normalize_pearson(filtered, config.normalize.n_hvg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    /// 3 cells × 3 genes: one all-zero gene, one binary gene, one signal gene.
    fn create_toy_matrix() -> ExpressionMatrix {
        let mut tri = TriMat::new((3, 3));
        tri.add_triplet(0, 0, 10.0);
        tri.add_triplet(1, 0, 5.0);
        tri.add_triplet(2, 0, 2.0);
        tri.add_triplet(0, 1, 1.0);
        tri.add_triplet(2, 1, 1.0);
        // gene 2 all-zero

        let cell_ids = vec!["Cell_1".into(), "Cell_2".into(), "Cell_3".into()];
        let gene_ids = vec!["Gene_A".into(), "Gene_Binary".into(), "Gene_Zero".into()];
        ExpressionMatrix::from_sparse(tri.to_csr(), cell_ids, gene_ids).unwrap()
    }

    #[test]
    fn test_log_cpm_toy_pipeline() {
        let raw = create_toy_matrix();
        let reduced = preprocess_with(
            &raw,
            NormalizationMethod::LogCpm,
            Species::Human,
            1,
        )
        .unwrap();

        // No marker genes present, so no cell is dropped; only the
        // real-signal gene survives the magnitude filter, and PCA keeps
        // one component.
        assert_eq!(reduced.n_cells(), 3);
        assert_eq!(reduced.n_genes(), 1);
        assert_eq!(reduced.gene_ids(), &["PC1"]);
        assert_eq!(reduced.cell_ids(), raw.cell_ids());
    }

    #[test]
    fn test_pearson_branch_runs() {
        let raw = create_toy_matrix();
        let config = PreprocessConfig {
            method: NormalizationMethod::PearsonResiduals,
            n_pca_components: 1,
            normalize: NormalizationConfig {
                n_hvg: 10,
                ..NormalizationConfig::default()
            },
            ..PreprocessConfig::default()
        };
        let reduced = preprocess(&raw, &config).unwrap();
        assert_eq!(reduced.n_cells(), 3);
        assert_eq!(reduced.n_genes(), 1);
    }

    #[test]
    fn test_mito_cells_removed_before_normalization() {
        // One cell dominated by mitochondrial counts must not survive.
        let mut tri = TriMat::new((3, 2));
        tri.add_triplet(0, 0, 100.0);
        tri.add_triplet(0, 1, 2.0);
        tri.add_triplet(1, 0, 3.0);
        tri.add_triplet(1, 1, 100.0);
        tri.add_triplet(2, 0, 2.0);
        tri.add_triplet(2, 1, 100.0);
        let raw = ExpressionMatrix::from_sparse(
            tri.to_csr(),
            vec!["dying".into(), "ok_1".into(), "ok_2".into()],
            vec!["MT-ND1".into(), "Gene_A".into()],
        )
        .unwrap();

        let reduced =
            preprocess_with(&raw, NormalizationMethod::LogCpm, Species::Human, 1).unwrap();
        assert_eq!(reduced.cell_ids(), &["ok_1", "ok_2"]);
    }

    #[test]
    fn test_config_defaults() {
        let config = PreprocessConfig::default();
        assert_eq!(config.filter.min_count, 2.0);
        assert_eq!(config.normalize.rescale, 1_000_000.0);
        assert_eq!(config.normalize.pseudocount, 1.0);
        assert_eq!(config.normalize.n_hvg, 3000);
        assert_eq!(config.n_pca_components, 50);
        assert!(matches!(
            config.filter.mito_cutoff,
            CutoffMode::Fixed(t) if t == 0.05
        ));
    }

    #[test]
    fn test_config_yaml_roundtrip() {
        let config = PreprocessConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: PreprocessConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.method, config.method);
        assert_eq!(parsed.n_pca_components, config.n_pca_components);
    }
}

//! Marker gene sets used as cell-quality signals.
//!
//! Gene sets are domain constants keyed by (species, category), loaded once
//! and immutable thereafter. Mitochondrial genes are detected by name prefix
//! on the matrix columns; apoptosis and rRNA sets are curated lists matched
//! exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Species the marker catalog covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Human,
    Mouse,
}

impl std::str::FromStr for Species {
    type Err = crate::error::PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Species::Human),
            "mouse" => Ok(Species::Mouse),
            _ => Err(crate::error::PrepError::InvalidParameter(format!(
                "Unknown species '{}' (expected 'human' or 'mouse')",
                s
            ))),
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Human => write!(f, "human"),
            Species::Mouse => write!(f, "mouse"),
        }
    }
}

/// Biological category of a marker gene set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneCategory {
    Mitochondrial,
    Apoptosis,
    Rrna,
}

impl fmt::Display for GeneCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneCategory::Mitochondrial => write!(f, "mitochondrial"),
            GeneCategory::Apoptosis => write!(f, "apoptosis"),
            GeneCategory::Rrna => write!(f, "rRNA"),
        }
    }
}

/// How a gene set's names are matched against matrix columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchRule {
    /// Case-insensitive prefix match (catches human "MT-" and mouse "mt-").
    Prefix(&'static str),
    /// Case-sensitive exact match against the curated list.
    Exact,
}

/// An ordered, immutable collection of marker gene names.
#[derive(Debug, Clone)]
pub struct GeneSet {
    category: GeneCategory,
    species: Species,
    rule: MatchRule,
    names: &'static [&'static str],
}

impl GeneSet {
    /// Biological category.
    pub fn category(&self) -> GeneCategory {
        self.category
    }

    /// Species tag.
    pub fn species(&self) -> Species {
        self.species
    }

    /// Curated names (empty for prefix-matched sets).
    pub fn names(&self) -> &[&str] {
        self.names
    }

    /// Indices of matrix genes belonging to this set.
    ///
    /// Returned in matrix column order.
    pub fn resolve(&self, gene_ids: &[String]) -> Vec<usize> {
        match self.rule {
            MatchRule::Prefix(prefix) => gene_ids
                .iter()
                .enumerate()
                .filter(|(_, id)| {
                    id.get(..prefix.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
                })
                .map(|(i, _)| i)
                .collect(),
            MatchRule::Exact => gene_ids
                .iter()
                .enumerate()
                .filter(|(_, id)| self.names.contains(&id.as_str()))
                .map(|(i, _)| i)
                .collect(),
        }
    }
}

/// Catalog of marker gene sets keyed by (species, category).
pub struct GeneSetCatalog;

impl GeneSetCatalog {
    /// Look up the marker set for a species and category.
    pub fn get(species: Species, category: GeneCategory) -> GeneSet {
        let (rule, names): (MatchRule, &'static [&'static str]) = match (species, category) {
            (_, GeneCategory::Mitochondrial) => (MatchRule::Prefix(MITO_PREFIX), &[]),
            (Species::Human, GeneCategory::Apoptosis) => (MatchRule::Exact, HUMAN_APOPTOSIS_GENES),
            (Species::Mouse, GeneCategory::Apoptosis) => (MatchRule::Exact, MOUSE_APOPTOSIS_GENES),
            (Species::Human, GeneCategory::Rrna) => (MatchRule::Exact, HUMAN_RRNA_GENES),
            (Species::Mouse, GeneCategory::Rrna) => (MatchRule::Exact, MOUSE_RRNA_GENES),
        };
        GeneSet {
            category,
            species,
            rule,
            names,
        }
    }
}

/// Mitochondrial gene symbol prefix; compared case-insensitively so mouse
/// "mt-" symbols are caught as well.
pub const MITO_PREFIX: &str = "MT-";

/// Core intrinsic/extrinsic apoptosis pathway genes (human symbols).
pub const HUMAN_APOPTOSIS_GENES: &[&str] = &[
    "APAF1", "BAD", "BAK1", "BAX", "BBC3", "BCL2", "BCL2L1", "BCL2L11", "BID", "BIRC2", "BIRC3",
    "BIRC5", "CASP3", "CASP6", "CASP7", "CASP8", "CASP9", "CASP10", "CFLAR", "CYCS", "DIABLO",
    "FADD", "FAS", "FASLG", "PMAIP1", "TNF", "TNFRSF10A", "TNFRSF10B", "TP53", "TRADD", "XIAP",
];

/// Mouse orthologs of the apoptosis set (note Trp53 for human TP53).
pub const MOUSE_APOPTOSIS_GENES: &[&str] = &[
    "Apaf1", "Bad", "Bak1", "Bax", "Bbc3", "Bcl2", "Bcl2l1", "Bcl2l11", "Bid", "Birc2", "Birc3",
    "Birc5", "Casp3", "Casp6", "Casp7", "Casp8", "Casp9", "Cflar", "Cycs", "Diablo", "Fadd",
    "Fas", "Fasl", "Pmaip1", "Tnf", "Tnfrsf10b", "Trp53", "Tradd", "Xiap",
];

/// Cytosolic ribosomal RNA genes (human symbols).
pub const HUMAN_RRNA_GENES: &[&str] = &[
    "RNA18S5", "RNA28S5", "RNA45S5", "RNA5-8S5", "RNA5S1", "RNA5S2", "RNA5S3", "RNA5S4",
    "RNA5S5", "RNA5S6", "RNA5S7", "RNA5S8", "RNA5S9", "RNA5S10", "RNA5S11", "RNA5S12",
    "RNA5S13", "RNA5S14", "RNA5S15", "RNA5S16", "RNA5S17",
];

/// Cytosolic ribosomal RNA genes (mouse symbols).
pub const MOUSE_RRNA_GENES: &[&str] = &[
    "Rn18s", "Rn28s1", "Rn45s", "Rn5-8s", "Rn5s", "Rn7s1", "Rn7s2", "Rn7sk",
];

//! Per-dataset configuration records.

use crate::error::{PrepError, Result};
use crate::genes::Species;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default cluster count when a dataset record does not supply one.
pub const DEFAULT_N_CLUSTERS: usize = 5;

/// Optional per-dataset record supplying species and cluster count.
///
/// Absent fields fall back to defaults (`human`, 5 clusters), so an empty
/// record is always usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Species the dataset was sampled from.
    #[serde(default)]
    pub species: Option<Species>,
    /// Expected number of clusters for downstream algorithms.
    #[serde(default)]
    pub n_clusters: Option<usize>,
}

impl DatasetConfig {
    /// Load from a YAML file.
    ///
    /// Fails with [`PrepError::MissingInput`] when the file does not exist.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PrepError::MissingInput(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(PrepError::from)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(PrepError::from)
    }

    /// Species, defaulting to human.
    pub fn species_or_default(&self) -> Species {
        self.species.unwrap_or(Species::Human)
    }

    /// Cluster count, defaulting to [`DEFAULT_N_CLUSTERS`].
    pub fn n_clusters_or_default(&self) -> usize {
        self.n_clusters.unwrap_or(DEFAULT_N_CLUSTERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let config = DatasetConfig::from_yaml("{}").unwrap();
        assert_eq!(config.species_or_default(), Species::Human);
        assert_eq!(config.n_clusters_or_default(), 5);
    }

    #[test]
    fn test_explicit_fields() {
        let config = DatasetConfig::from_yaml("species: mouse\nn_clusters: 8\n").unwrap();
        assert_eq!(config.species_or_default(), Species::Mouse);
        assert_eq!(config.n_clusters_or_default(), 8);
    }

    #[test]
    fn test_json_record() {
        let config = DatasetConfig::from_json(r#"{"species": "human", "n_clusters": 3}"#).unwrap();
        assert_eq!(config.species_or_default(), Species::Human);
        assert_eq!(config.n_clusters_or_default(), 3);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = DatasetConfig::from_yaml_file("/no/such/dataset.yaml").unwrap_err();
        assert!(matches!(err, PrepError::MissingInput(_)));
    }
}

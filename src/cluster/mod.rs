//! Clustering strategy interface.
//!
//! The preprocessing core does not implement clustering algorithms; it hands
//! the reduced matrix to a strategy registered by the caller. Strategies are
//! registered explicitly under a name and dispatched through the
//! [`ClusteringStrategy`] capability trait.

use crate::data::ExpressionMatrix;
use crate::error::{PrepError, Result};
use std::collections::BTreeMap;

/// Parameters handed to a clustering strategy.
#[derive(Debug, Clone, Copy)]
pub struct ClusterParams {
    /// Number of clusters to produce.
    pub n_clusters: usize,
    /// Seed for any randomized sub-algorithm, for reproducible runs.
    pub seed: u64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            n_clusters: crate::data::DEFAULT_N_CLUSTERS,
            seed: 42,
        }
    }
}

/// A clustering algorithm consumed by the pipeline's caller.
pub trait ClusteringStrategy: Send + Sync {
    /// Stable identifier the strategy is registered under.
    fn name(&self) -> &str;

    /// Assign an integer cluster label to every cell (row) of `matrix`.
    ///
    /// The returned vector has one label per cell, in row order.
    fn fit_predict(&self, matrix: &ExpressionMatrix, params: &ClusterParams)
        -> Result<Vec<usize>>;
}

/// Registry of named clustering strategies.
///
/// Registration is explicit; looking up an unregistered name fails with an
/// error enumerating the available names.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Box<dyn ClusteringStrategy>>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under its own name, replacing any previous
    /// strategy with that name.
    pub fn register(&mut self, strategy: Box<dyn ClusteringStrategy>) {
        self.strategies
            .insert(strategy.name().to_string(), strategy);
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.strategies.keys().cloned().collect()
    }

    /// Look up a strategy by name.
    pub fn get(&self, name: &str) -> Result<&dyn ClusteringStrategy> {
        self.strategies
            .get(name)
            .map(|s| s.as_ref())
            .ok_or_else(|| PrepError::AlgorithmNotFound {
                name: name.to_string(),
                available: self.names(),
            })
    }
}

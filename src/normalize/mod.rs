//! Normalization branches for expression matrices.
//!
//! Two mutually exclusive branches exist: library-size scaling followed by a
//! log transform (log-CPM), or negative-binomial Pearson residuals. The
//! pipeline selects exactly one per invocation.

mod library_size;
mod log;
mod pearson;

pub use self::log::log_transform;
pub use library_size::{normalize_by_library_size, CPM_RESCALE};
pub use pearson::normalize_pearson;

use crate::error::PrepError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalization branch selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMethod {
    /// Library-size normalization to CPM followed by log10(x + 1).
    LogCpm,
    /// Negative-binomial Pearson residuals with HVG selection.
    PearsonResiduals,
}

impl FromStr for NormalizationMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log_cpm" => Ok(NormalizationMethod::LogCpm),
            "pearson_residuals" | "pearson" => Ok(NormalizationMethod::PearsonResiduals),
            _ => Err(PrepError::UnknownNormalization(s.to_string())),
        }
    }
}

impl fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationMethod::LogCpm => write!(f, "log_cpm"),
            NormalizationMethod::PearsonResiduals => write!(f, "pearson_residuals"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!(
            "log_cpm".parse::<NormalizationMethod>().unwrap(),
            NormalizationMethod::LogCpm
        );
        assert_eq!(
            "pearson_residuals".parse::<NormalizationMethod>().unwrap(),
            NormalizationMethod::PearsonResiduals
        );
        // Short alias used by the historical pipeline variants
        assert_eq!(
            "pearson".parse::<NormalizationMethod>().unwrap(),
            NormalizationMethod::PearsonResiduals
        );
    }

    #[test]
    fn test_unknown_method_is_config_error() {
        let err = "tfidf".parse::<NormalizationMethod>().unwrap_err();
        assert!(matches!(err, PrepError::UnknownNormalization(name) if name == "tfidf"));
    }

    #[test]
    fn test_display_roundtrip() {
        for method in [
            NormalizationMethod::LogCpm,
            NormalizationMethod::PearsonResiduals,
        ] {
            let parsed: NormalizationMethod = method.to_string().parse().unwrap();
            assert_eq!(parsed, method);
        }
    }
}

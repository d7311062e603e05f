//! Gene and cell quality filters.

mod fraction;
mod magnitude;

pub use fraction::{
    filter_by_fraction, filter_by_fraction_with_stats, CutoffMode, FractionFilterResult,
};
pub use magnitude::filter_low_magnitude;

//! Mathematical utilities: summary statistics and normal quantiles.

pub mod stats;

pub use stats::*;

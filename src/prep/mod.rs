//! Dataset preparation: period validation, standardization, assembly.

pub mod dataset;
pub mod period;
pub mod scaler;

pub use dataset::*;
pub use period::*;
pub use scaler::*;

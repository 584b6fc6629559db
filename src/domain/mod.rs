//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - time index keys and period bounds (`IndexKey`, `Period`, `PeriodBound`)
//! - the in-memory table model (`TimeSeriesTable`, `Column`)
//! - the plot vocabulary (`Scale`, `Statistic`, `LineStat`, `BandMethod`)

pub mod table;
pub mod types;

pub use table::*;
pub use types::*;

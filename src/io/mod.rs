//! Input/output helpers.
//!
//! - CSV ingest for input series and evaluation tables (`ingest`)
//! - CSV/JSON exports of prepared data and plot frames (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;

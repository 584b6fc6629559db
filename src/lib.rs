//! `impact-prep` library crate.
//!
//! Prepares time series for a causal-impact model and turns the model's
//! evaluation output into a canonical long-form plot frame. The binary
//! (`impact`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the dataset and plot frame can be consumed by other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod plotdata;
pub mod prep;
pub mod render;
pub mod report;

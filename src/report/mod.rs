//! Reporting utilities: terminal summaries of prepared data and plot frames.

pub mod format;

pub use format::*;

//! Crate-wide error type.
//!
//! Every failure is raised at the point of detection and carries an exit code
//! so the `impact` binary can report it the same way regardless of which stage
//! produced it.

use std::fmt;

use thiserror::Error;

/// Which period bound a period error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundName {
    PreStart,
    PreEnd,
    PostStart,
    PostEnd,
}

impl fmt::Display for BoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BoundName::PreStart => "pre-period start",
            BoundName::PreEnd => "pre-period end",
            BoundName::PostStart => "post-period start",
            BoundName::PostEnd => "post-period end",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// A named column does not exist in the input.
    #[error("Column not found: {0}")]
    MissingColumn(String),

    /// Wrong input shape: non-numeric column, unordered index, etc.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Input is well-formed but statistically unusable.
    #[error("Invalid data: {0}")]
    Statistical(String),

    #[error("Invalid {bound}: {message}")]
    Period { bound: BoundName, message: String },

    #[error("Periods overlap: {0}")]
    PeriodOverlap(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Plot-data reshaping could not find what it needs.
    #[error("Reshape error: {0}")]
    Reshape(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl AppError {
    pub fn period(bound: BoundName, message: impl Into<String>) -> Self {
        AppError::Period {
            bound,
            message: message.into(),
        }
    }

    /// Process exit code used by the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Statistical(_) => 3,
            AppError::Reshape(_) => 4,
            AppError::MissingColumn(_)
            | AppError::Schema(_)
            | AppError::Period { .. }
            | AppError::PeriodOverlap(_)
            | AppError::InvalidArgument(_)
            | AppError::Config(_)
            | AppError::Io(_) => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

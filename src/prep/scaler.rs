//! Per-column standardization.
//!
//! A [`Scaler`] is plain data: the mean and population standard deviation of
//! each column over a reference window (normally the pre-period). Applying or
//! inverting it never mutates the scaler.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Column, TimeSeriesTable};
use crate::error::{AppError, Result};
use crate::math::{is_constant, mean_std};

/// Fitted location/scale for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub name: String,
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    columns: Vec<ColumnScale>,
}

impl Scaler {
    /// Fit every column of `table`, ignoring missing values.
    ///
    /// Fails if a column is non-numeric, has no observations, or has zero variance.
    pub fn fit(table: &TimeSeriesTable) -> Result<Scaler> {
        let columns = table
            .columns()
            .iter()
            .map(fit_column)
            .collect::<Result<Vec<_>>>()?;
        Ok(Scaler { columns })
    }

    /// Fit a single column, e.g. the target, so model output can be
    /// back-transformed independently of covariates.
    pub fn fit_column(table: &TimeSeriesTable, name: &str) -> Result<Scaler> {
        let column = table
            .column(name)
            .ok_or_else(|| AppError::MissingColumn(name.to_string()))?;
        Ok(Scaler {
            columns: vec![fit_column(column)?],
        })
    }

    pub fn columns(&self) -> &[ColumnScale] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&ColumnScale> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Apply `(x - mean) / std` to every column of `table`.
    pub fn transform(&self, table: &TimeSeriesTable) -> Result<TimeSeriesTable> {
        self.map_columns(table, |x, s| (x - s.mean) / s.std)
    }

    /// Undo [`Scaler::transform`].
    pub fn inverse(&self, table: &TimeSeriesTable) -> Result<TimeSeriesTable> {
        self.map_columns(table, |z, s| z * s.std + s.mean)
    }

    /// Back-transform a bare series with a single-column scaler.
    pub fn inverse_values(&self, values: &[f64]) -> Result<Vec<f64>> {
        let [scale] = self.columns.as_slice() else {
            return Err(AppError::InvalidArgument(format!(
                "inverse_values needs a single-column scaler; this one has {} columns.",
                self.columns.len()
            )));
        };
        Ok(values.iter().map(|z| z * scale.std + scale.mean).collect())
    }

    fn map_columns(
        &self,
        table: &TimeSeriesTable,
        f: impl Fn(f64, &ColumnScale) -> f64,
    ) -> Result<TimeSeriesTable> {
        let columns = table
            .columns()
            .iter()
            .map(|col| {
                let scale = self.get(&col.name).ok_or_else(|| {
                    AppError::Schema(format!(
                        "Column `{}` was not present when the scaler was fitted.",
                        col.name
                    ))
                })?;
                let values = col.values().ok_or_else(|| {
                    AppError::Schema(format!("Column `{}` is not numeric.", col.name))
                })?;
                Ok(Column::numeric(
                    col.name.clone(),
                    values.iter().map(|v| v.map(|x| f(x, scale))).collect(),
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        table.with_columns(columns)
    }
}

fn fit_column(column: &Column) -> Result<ColumnScale> {
    if !column.is_numeric() {
        return Err(AppError::Schema(format!(
            "Column `{}` is not numeric and cannot be standardized.",
            column.name
        )));
    }
    let observed = column.observed();
    let (mean, std) = mean_std(&observed).ok_or_else(|| {
        AppError::Statistical(format!(
            "Column `{}` has no observations in the fit window.",
            column.name
        ))
    })?;
    if is_constant(&observed) || !(std.is_finite() && std > 0.0) {
        return Err(AppError::Statistical(format!(
            "Column `{}` has zero variance in the fit window and cannot be standardized.",
            column.name
        )));
    }
    debug!(column = %column.name, mean, std, "fitted column scale");
    Ok(ColumnScale {
        name: column.name.clone(),
        mean,
        std,
    })
}

//! Model-ready dataset assembly.
//!
//! Given a raw table and the two periods, this module:
//!
//! - resolves the target column and orders the columns target-first
//! - rejects inputs the model cannot use (constant target, too few observations,
//!   missing covariates, non-numeric columns)
//! - slices the pre-period and everything strictly after it
//! - standardizes both slices with statistics from the pre-period
//! - packages the masked target series and the whole-horizon feature matrix
//!
//! All validation happens before any slice is materialized, so a failed build
//! leaves nothing half-constructed behind.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{IndexKey, PeriodBound, Periods, TimeSeriesTable};
use crate::error::{AppError, Result};
use crate::math::is_constant;
use crate::prep::period::validate_periods;
use crate::prep::scaler::{ColumnScale, Scaler};

/// Name of the constant column appended to the feature matrix.
pub const INTERCEPT_COLUMN: &str = "intercept_";

/// Minimum number of non-missing target observations.
const MIN_TARGET_OBSERVATIONS: usize = 3;

/// Options for [`Dataset::new`].
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    /// Target column; defaults to the first column of the table.
    pub target: Option<String>,
    /// Standardize every column with pre-period mean/std.
    pub standardize: bool,
    /// Drop rows with any missing value from the normalized after-pre slice.
    pub drop_post_period_missing: bool,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            target: None,
            standardize: true,
            drop_post_period_missing: true,
        }
    }
}

/// A series paired with a per-point missingness flag.
///
/// Missing points hold `NaN` in `values`; `is_missing` is the authoritative mask.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedSeries {
    pub index: Vec<IndexKey>,
    pub values: DVector<f64>,
    pub is_missing: Vec<bool>,
}

impl MaskedSeries {
    fn from_values(index: &[IndexKey], values: &[Option<f64>]) -> Self {
        Self {
            index: index.to_vec(),
            values: DVector::from_iterator(values.len(), values.iter().map(|v| v.unwrap_or(f64::NAN))),
            is_missing: values.iter().map(Option::is_none).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.is_missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_missing.is_empty()
    }

    pub fn observed_count(&self) -> usize {
        self.is_missing.iter().filter(|m| !**m).count()
    }
}

/// Standardized covariates over the whole horizon, plus an intercept column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub index: Vec<IndexKey>,
    /// Column names; the last one is [`INTERCEPT_COLUMN`].
    pub names: Vec<String>,
    pub matrix: DMatrix<f64>,
}

/// A validated, sliced and (optionally) standardized analysis dataset.
///
/// Read-only after construction.
#[derive(Debug, Clone)]
pub struct Dataset {
    data: TimeSeriesTable,
    periods: Periods,
    target: String,
    features: Vec<String>,
    standardize: bool,
    pre_data: TimeSeriesTable,
    after_pre_data: TimeSeriesTable,
    normalized_pre_data: TimeSeriesTable,
    normalized_after_pre_data: TimeSeriesTable,
    num_steps_forecast: usize,
    scaler: Option<Scaler>,
    target_scaler: Option<Scaler>,
    pre_target: MaskedSeries,
    whole_period_features: Option<FeatureMatrix>,
}

impl Dataset {
    pub fn new(
        table: TimeSeriesTable,
        pre: (PeriodBound, PeriodBound),
        post: (PeriodBound, PeriodBound),
        options: &DatasetOptions,
    ) -> Result<Dataset> {
        let periods = validate_periods(table.index(), pre, post)?;
        let (data, target, features) = validate_columns(&table, options.target.as_deref())?;

        let pre_period = periods.pre;
        let pre_data = data.filter_rows(|k| pre_period.contains(k));
        // Everything after the pre-period, not just the post-period: the gap
        // before the post-period and any trailing tail are forecast as well.
        let after_pre_data = data.filter_rows(|k| *k > pre_period.end);
        let num_steps_forecast = after_pre_data.len();

        let (scaler, target_scaler, normalized_pre_data, mut normalized_after_pre_data) = if options.standardize {
            let scaler = Scaler::fit(&pre_data)?;
            let target_scaler = Scaler::fit_column(&pre_data, &target)?;
            let normalized_pre = scaler.transform(&pre_data)?;
            let normalized_after = scaler.transform(&after_pre_data)?;
            (Some(scaler), Some(target_scaler), normalized_pre, normalized_after)
        } else {
            (None, None, pre_data.clone(), after_pre_data.clone())
        };
        if options.drop_post_period_missing {
            let before = normalized_after_pre_data.len();
            normalized_after_pre_data = normalized_after_pre_data.drop_missing_rows();
            let dropped = before - normalized_after_pre_data.len();
            if dropped > 0 {
                debug!(dropped, "dropped after-pre rows with missing values");
            }
        }

        let target_values = normalized_pre_data
            .column(&target)
            .and_then(|c| c.values())
            .ok_or_else(|| AppError::MissingColumn(target.clone()))?;
        let pre_target = MaskedSeries::from_values(normalized_pre_data.index().keys(), target_values);

        let whole_period_features = if features.is_empty() {
            None
        } else {
            Some(build_feature_matrix(
                &normalized_pre_data,
                &normalized_after_pre_data,
                &features,
            )?)
        };

        info!(
            target_column = %target,
            features = features.len(),
            pre_rows = pre_data.len(),
            after_pre_rows = after_pre_data.len(),
            standardize = options.standardize,
            "prepared dataset"
        );

        Ok(Dataset {
            data,
            periods,
            target,
            features,
            standardize: options.standardize,
            pre_data,
            after_pre_data,
            normalized_pre_data,
            normalized_after_pre_data,
            num_steps_forecast,
            scaler,
            target_scaler,
            pre_target,
            whole_period_features,
        })
    }

    /// The validated table, target column first.
    pub fn data(&self) -> &TimeSeriesTable {
        &self.data
    }

    pub fn periods(&self) -> &Periods {
        &self.periods
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn is_standardized(&self) -> bool {
        self.standardize
    }

    pub fn pre_data(&self) -> &TimeSeriesTable {
        &self.pre_data
    }

    pub fn after_pre_data(&self) -> &TimeSeriesTable {
        &self.after_pre_data
    }

    pub fn normalized_pre_data(&self) -> &TimeSeriesTable {
        &self.normalized_pre_data
    }

    pub fn normalized_after_pre_data(&self) -> &TimeSeriesTable {
        &self.normalized_after_pre_data
    }

    /// Rows to forecast: everything strictly after the pre-period end.
    pub fn num_steps_forecast(&self) -> usize {
        self.num_steps_forecast
    }

    pub fn scaler(&self) -> Option<&Scaler> {
        self.scaler.as_ref()
    }

    pub fn target_scaler(&self) -> Option<&Scaler> {
        self.target_scaler.as_ref()
    }

    /// Masked (normalized) pre-period target series for the model.
    pub fn pre_target(&self) -> &MaskedSeries {
        &self.pre_target
    }

    /// Normalized features over pre-period plus after-pre rows, with intercept.
    pub fn whole_period_features(&self) -> Option<&FeatureMatrix> {
        self.whole_period_features.as_ref()
    }

    /// Bring model output for the target back to the original scale.
    pub fn inverse_target(&self, values: &[f64]) -> Result<Vec<f64>> {
        match &self.target_scaler {
            Some(scaler) => scaler.inverse_values(values),
            None => Ok(values.to_vec()),
        }
    }

    /// Serializable summary handed to the external model alongside the slices.
    pub fn manifest(&self) -> PreparedManifest {
        PreparedManifest {
            target: self.target.clone(),
            features: self.features.clone(),
            periods: self.periods,
            standardized: self.standardize,
            num_steps_forecast: self.num_steps_forecast,
            pre_rows: self.pre_data.len(),
            after_pre_rows: self.normalized_after_pre_data.len(),
            column_scales: self
                .scaler
                .as_ref()
                .map(|s| s.columns().to_vec())
                .unwrap_or_default(),
            pre_target: self
                .pre_target
                .index
                .iter()
                .zip(self.pre_target.values.iter())
                .zip(&self.pre_target.is_missing)
                .map(|((time, value), missing)| MaskedPoint {
                    time: *time,
                    value: (!missing).then_some(*value),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MaskedPoint {
    pub time: IndexKey,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreparedManifest {
    pub target: String,
    pub features: Vec<String>,
    pub periods: Periods,
    pub standardized: bool,
    pub num_steps_forecast: usize,
    pub pre_rows: usize,
    pub after_pre_rows: usize,
    pub column_scales: Vec<ColumnScale>,
    pub pre_target: Vec<MaskedPoint>,
}

/// Resolve target/feature columns and check the table is usable.
///
/// Returns the table reordered target-first, the target name and the feature names.
fn validate_columns(
    table: &TimeSeriesTable,
    target: Option<&str>,
) -> Result<(TimeSeriesTable, String, Vec<String>)> {
    // 1) Target column: explicit, or the first column.
    let target = match target {
        Some(name) => {
            if table.column(name).is_none() {
                return Err(AppError::MissingColumn(format!(
                    "target column `{name}` not found in data"
                )));
            }
            name.to_string()
        }
        None => table
            .columns()
            .first()
            .map(|c| c.name.clone())
            .ok_or_else(|| AppError::Schema("Input data has no columns.".to_string()))?,
    };

    // 2) A constant target has nothing to model.
    let target_col = table
        .column(&target)
        .ok_or_else(|| AppError::MissingColumn(target.clone()))?;
    if target_col.is_numeric() && is_constant(&target_col.observed()) {
        return Err(AppError::Statistical("Input response cannot be constant.".to_string()));
    }

    // 3) Features keep their original relative order.
    let features: Vec<String> = table
        .column_names()
        .into_iter()
        .filter(|name| *name != target)
        .map(str::to_string)
        .collect();
    let mut order: Vec<&str> = vec![target.as_str()];
    order.extend(features.iter().map(String::as_str));
    let data = table.select(&order)?;

    // 4) Observation counts and missing covariates.
    let observed = table.len() - target_col.missing_count();
    if observed < MIN_TARGET_OBSERVATIONS {
        return Err(AppError::Statistical(format!(
            "Input data must have at least {MIN_TARGET_OBSERVATIONS} observations (target has {observed})."
        )));
    }
    if let Some(col) = data.columns()[1..].iter().find(|c| c.missing_count() > 0) {
        return Err(AppError::Statistical(format!(
            "Input data cannot have any missing values (feature `{}` has {}).",
            col.name,
            col.missing_count()
        )));
    }

    // 5) Everything retained must be numeric.
    if let Some(col) = data.columns().iter().find(|c| !c.is_numeric()) {
        return Err(AppError::Schema(format!(
            "Input data must contain only numeric values (column `{}` is not numeric).",
            col.name
        )));
    }

    debug!(target_column = %target, ?features, "validated columns");
    Ok((data, target, features))
}

fn build_feature_matrix(
    pre: &TimeSeriesTable,
    after_pre: &TimeSeriesTable,
    features: &[String],
) -> Result<FeatureMatrix> {
    let names: Vec<&str> = features.iter().map(String::as_str).collect();
    let whole = pre.select(&names)?.concat_rows(&after_pre.select(&names)?)?;

    let columns: Vec<&[Option<f64>]> = whole
        .columns()
        .iter()
        .map(|c| {
            c.values()
                .ok_or_else(|| AppError::Schema(format!("Column `{}` is not numeric.", c.name)))
        })
        .collect::<Result<_>>()?;

    let n_cols = columns.len() + 1;
    let matrix = DMatrix::from_fn(whole.len(), n_cols, |r, c| match columns.get(c) {
        Some(col) => col[r].unwrap_or(f64::NAN),
        None => 1.0,
    });

    let mut out_names = features.to_vec();
    out_names.push(INTERCEPT_COLUMN.to_string());
    Ok(FeatureMatrix {
        index: whole.index().keys().to_vec(),
        names: out_names,
        matrix,
    })
}

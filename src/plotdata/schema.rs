//! Evaluation table and its column schema.
//!
//! The model reports each statistic on each scale as one column, named
//! `<scale prefix><statistic>`:
//!
//! | scale                | prefix                | example                    |
//! |----------------------|-----------------------|----------------------------|
//! | original             | `posterior_` / none   | `posterior_mean`, `observed` |
//! | pointwise effect     | `point_effects_`      | `point_effects_lower`      |
//! | cumulative effect    | `cumulative_effects_` | `cumulative_effects_std`   |
//!
//! Names are parsed once into an [`EvaluationSchema`] keyed by `(Scale, Statistic)`.
//! Prefixes are matched exactly, longest first, and the remainder must be a whole
//! statistic name, so `cumulative_effects_mean` can only mean
//! `(CumulativeEffects, Mean)`.

use std::collections::BTreeMap;

use tracing::warn;

use crate::domain::{Column, Periods, Scale, Statistic, TimeIndex};
use crate::error::{AppError, Result};

/// Names of the four period-boundary columns, in canonical order.
pub const PERIOD_COLUMNS: [&str; 4] = [
    "pre_period_start",
    "pre_period_end",
    "post_period_start",
    "post_period_end",
];

const SCALE_PREFIXES: [(&str, Scale); 3] = [
    ("cumulative_effects_", Scale::CumulativeEffects),
    ("point_effects_", Scale::PointEffects),
    ("posterior_", Scale::Original),
];

/// Classify a column name, or `None` if it is not a statistic column.
pub fn parse_column_name(name: &str) -> Option<(Scale, Statistic)> {
    if name == Statistic::Observed.as_str() {
        return Some((Scale::Original, Statistic::Observed));
    }
    SCALE_PREFIXES.iter().find_map(|(prefix, scale)| {
        name.strip_prefix(prefix)
            .and_then(Statistic::from_name)
            .map(|stat| (*scale, stat))
    })
}

/// Column name the model uses for `(scale, stat)`.
pub fn column_name(scale: Scale, stat: Statistic) -> String {
    match (scale, stat) {
        (Scale::Original, Statistic::Observed) => stat.as_str().to_string(),
        (Scale::Original, _) => format!("posterior_{}", stat.as_str()),
        (scale, stat) => format!("{}_{}", scale.as_str(), stat.as_str()),
    }
}

/// Mapping from `(scale, statistic)` to a column position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationSchema {
    entries: BTreeMap<(Scale, Statistic), usize>,
}

impl EvaluationSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema by parsing column names. Unrecognised names are skipped.
    pub fn from_column_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut schema = EvaluationSchema::new();
        for (pos, name) in names.iter().enumerate() {
            let name = name.as_ref();
            match parse_column_name(name) {
                Some((scale, stat)) => schema.insert(scale, stat, pos)?,
                None => warn!(column = name, "ignoring unrecognised evaluation column"),
            }
        }
        Ok(schema)
    }

    /// Register a column; each `(scale, stat)` may be mapped once.
    pub fn insert(&mut self, scale: Scale, stat: Statistic, position: usize) -> Result<()> {
        if self.entries.insert((scale, stat), position).is_some() {
            return Err(AppError::Schema(format!(
                "More than one column provides {} on the {} scale.",
                stat.as_str(),
                scale.as_str()
            )));
        }
        Ok(())
    }

    pub fn get(&self, scale: Scale, stat: Statistic) -> Option<usize> {
        self.entries.get(&(scale, stat)).copied()
    }

    pub fn has_statistic(&self, stat: Statistic) -> bool {
        self.entries.keys().any(|(_, s)| *s == stat)
    }

    /// Entries in `(scale, statistic)` order.
    pub fn entries(&self) -> impl Iterator<Item = (Scale, Statistic, usize)> + '_ {
        self.entries.iter().map(|(&(scale, stat), &pos)| (scale, stat, pos))
    }
}

/// Wide model output: one row per time step, one column per `(scale, statistic)`.
#[derive(Debug, Clone)]
pub struct EvaluationTable {
    index: TimeIndex,
    columns: Vec<Column>,
    periods: Periods,
    schema: EvaluationSchema,
}

impl EvaluationTable {
    /// Build a table whose schema is derived from the column names.
    pub fn new(index: TimeIndex, columns: Vec<Column>, periods: Periods) -> Result<Self> {
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let schema = EvaluationSchema::from_column_names(&names)?;
        Self::with_schema(index, columns, periods, schema)
    }

    /// Build a table with an explicit schema supplied by the producer.
    pub fn with_schema(
        index: TimeIndex,
        columns: Vec<Column>,
        periods: Periods,
        schema: EvaluationSchema,
    ) -> Result<Self> {
        for col in &columns {
            if !col.is_numeric() {
                return Err(AppError::Schema(format!(
                    "Evaluation column `{}` is not numeric.",
                    col.name
                )));
            }
            if col.data.len() != index.len() {
                return Err(AppError::Schema(format!(
                    "Evaluation column `{}` has {} values but the index has {} entries.",
                    col.name,
                    col.data.len(),
                    index.len()
                )));
            }
        }
        if let Some((scale, stat, pos)) = schema.entries().find(|(_, _, pos)| *pos >= columns.len()) {
            return Err(AppError::Schema(format!(
                "Schema maps {} on the {} scale to column {pos}, but the table has {} columns.",
                stat.as_str(),
                scale.as_str(),
                columns.len()
            )));
        }
        Ok(Self {
            index,
            columns,
            periods,
            schema,
        })
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn periods(&self) -> &Periods {
        &self.periods
    }

    pub fn schema(&self) -> &EvaluationSchema {
        &self.schema
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Values of `(scale, stat)`, if the model produced that column.
    pub fn values(&self, scale: Scale, stat: Statistic) -> Option<&[Option<f64>]> {
        self.schema
            .get(scale, stat)
            .and_then(|pos| self.columns[pos].values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_mean_is_not_its_own_scale() {
        assert_eq!(
            parse_column_name("cumulative_effects_mean"),
            Some((Scale::CumulativeEffects, Statistic::Mean))
        );
        assert_eq!(
            parse_column_name("point_effects_std"),
            Some((Scale::PointEffects, Statistic::Std))
        );
    }

    #[test]
    fn original_scale_names() {
        assert_eq!(parse_column_name("observed"), Some((Scale::Original, Statistic::Observed)));
        assert_eq!(parse_column_name("posterior_median"), Some((Scale::Original, Statistic::Median)));
        assert_eq!(parse_column_name("posterior_upper"), Some((Scale::Original, Statistic::Upper)));
    }

    #[test]
    fn unrelated_names_do_not_parse() {
        for name in ["time", "mean", "pre_period_start", "point_effects_mean_x", "posterior_"] {
            assert_eq!(parse_column_name(name), None, "{name}");
        }
    }

    #[test]
    fn column_name_is_the_inverse_of_parsing() {
        for scale in Scale::ALL {
            for stat in Statistic::ALL {
                if scale != Scale::Original && stat == Statistic::Observed {
                    continue;
                }
                assert_eq!(parse_column_name(&column_name(scale, stat)), Some((scale, stat)));
            }
        }
    }

    #[test]
    fn duplicate_mapping_is_rejected() {
        let mut schema = EvaluationSchema::new();
        schema.insert(Scale::Original, Statistic::Mean, 0).unwrap();
        assert!(matches!(
            schema.insert(Scale::Original, Statistic::Mean, 1),
            Err(AppError::Schema(_))
        ));
    }
}

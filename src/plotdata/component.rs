//! Long-form component tables extracted from an [`EvaluationTable`].
//!
//! One evaluation table holds three kinds of plot layer:
//!
//! - `lines`: point estimates (`observed`, `mean`, `median`), one row per
//!   `(time, scale, stat)`
//! - `bands`: posterior quantile intervals (`lower`, `upper`), one row per
//!   `(time, scale)`
//! - `std`: a normal-approximation interval `mean ± z·std`, also one row per
//!   `(time, scale)`
//!
//! Band rows exist only where at least one bound is known; the point-estimate
//! series usually extends beyond them.

use std::fmt;
use std::str::FromStr;

use crate::domain::{BandMethod, IndexKey, LineStat, Scale, Statistic};
use crate::error::{AppError, Result};
use crate::math::normal_critical_value;

use super::schema::EvaluationTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Lines,
    Bands,
    Std,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Lines, Component::Bands, Component::Std];

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Lines => "lines",
            Component::Bands => "bands",
            Component::Std => "std",
        }
    }

    /// Statistics the component reads.
    pub fn statistics(self) -> &'static [Statistic] {
        match self {
            Component::Lines => &[Statistic::Observed, Statistic::Mean, Statistic::Median],
            Component::Bands => &[Statistic::Lower, Statistic::Upper],
            Component::Std => &[Statistic::Mean, Statistic::Std],
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Component::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "`component` must be one of {{lines, bands, std}}. Got '{s}'."
                ))
            })
    }
}

/// One point-estimate observation.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRow {
    pub time: IndexKey,
    pub scale: Scale,
    pub stat: LineStat,
    pub value: Option<f64>,
}

/// One interval observation.
#[derive(Debug, Clone, PartialEq)]
pub struct BandRow {
    pub time: IndexKey,
    pub scale: Scale,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub band_method: BandMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentTable {
    Lines(Vec<LineRow>),
    Bands(Vec<BandRow>),
}

impl ComponentTable {
    pub fn len(&self) -> usize {
        match self {
            ComponentTable::Lines(rows) => rows.len(),
            ComponentTable::Bands(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extract a single component. `alpha` is only used by [`Component::Std`].
pub fn extract_component(
    table: &EvaluationTable,
    component: Component,
    alpha: f64,
) -> Result<ComponentTable> {
    match component {
        Component::Lines => extract_lines(table).map(ComponentTable::Lines),
        Component::Bands => extract_quantile_bands(table).map(ComponentTable::Bands),
        Component::Std => extract_std_bands(table, alpha).map(ComponentTable::Bands),
    }
}

/// Point estimates in schema order, then time order.
pub fn extract_lines(table: &EvaluationTable) -> Result<Vec<LineRow>> {
    let keys = table.index().keys();
    let mut rows = Vec::new();
    for (scale, stat, _) in table.schema().entries() {
        let Some(line) = stat.as_line() else {
            continue;
        };
        let Some(values) = table.values(scale, stat) else {
            continue;
        };
        rows.extend(keys.iter().zip(values).map(|(time, value)| LineRow {
            time: *time,
            scale,
            stat: line,
            value: *value,
        }));
    }
    if rows.is_empty() && !keys.is_empty() {
        return Err(missing_columns(Component::Lines));
    }
    Ok(rows)
}

/// Posterior quantile bands.
pub fn extract_quantile_bands(table: &EvaluationTable) -> Result<Vec<BandRow>> {
    let scales: Vec<Scale> = Scale::ALL
        .into_iter()
        .filter(|scale| {
            table.schema().get(*scale, Statistic::Lower).is_some()
                || table.schema().get(*scale, Statistic::Upper).is_some()
        })
        .collect();
    if scales.is_empty() {
        return Err(missing_columns(Component::Bands));
    }

    let keys = table.index().keys();
    let mut rows = Vec::new();
    for scale in scales {
        let lower = table.values(scale, Statistic::Lower);
        let upper = table.values(scale, Statistic::Upper);
        for (i, time) in keys.iter().enumerate() {
            let lo = lower.and_then(|v| v[i]);
            let hi = upper.and_then(|v| v[i]);
            if lo.is_none() && hi.is_none() {
                continue;
            }
            rows.push(BandRow {
                time: *time,
                scale,
                lower: lo,
                upper: hi,
                band_method: BandMethod::Quantiles,
            });
        }
    }
    Ok(rows)
}

/// Normal-approximation bands `mean ± z·std`, with `z` the two-sided critical
/// value for `alpha`.
///
/// Every scale carrying a `std` column needs a matching `mean` column.
pub fn extract_std_bands(table: &EvaluationTable, alpha: f64) -> Result<Vec<BandRow>> {
    let z = normal_critical_value(alpha)?;
    let schema = table.schema();
    let scales: Vec<Scale> = Scale::ALL
        .into_iter()
        .filter(|scale| schema.get(*scale, Statistic::Std).is_some())
        .collect();
    if scales.is_empty() {
        return Err(missing_columns(Component::Std));
    }

    let keys = table.index().keys();
    let mut rows = Vec::new();
    for scale in scales {
        let (Some(mean), Some(std)) = (
            table.values(scale, Statistic::Mean),
            table.values(scale, Statistic::Std),
        ) else {
            return Err(AppError::Reshape(format!(
                "{scale} scale has a std column but no mean column to centre the band on.",
                scale = scale.as_str()
            )));
        };
        for ((time, m), s) in keys.iter().zip(mean).zip(std) {
            let (Some(m), Some(s)) = (m, s) else {
                continue;
            };
            rows.push(BandRow {
                time: *time,
                scale,
                lower: Some(m - z * s),
                upper: Some(m + z * s),
                band_method: BandMethod::Std,
            });
        }
    }
    Ok(rows)
}

fn missing_columns(component: Component) -> AppError {
    let wanted: Vec<&str> = component.statistics().iter().map(|s| s.as_str()).collect();
    AppError::Reshape(format!(
        "Evaluation table has no columns for the `{component}` component (expected one of: {}).",
        wanted.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, Period, Periods, TimeIndex};

    fn periods() -> Periods {
        Periods {
            pre: Period {
                start: IndexKey::Integer(0),
                end: IndexKey::Integer(1),
            },
            post: Period {
                start: IndexKey::Integer(2),
                end: IndexKey::Integer(3),
            },
        }
    }

    fn eval(cols: Vec<(&str, Vec<Option<f64>>)>) -> EvaluationTable {
        let index = TimeIndex::new((0..4).map(IndexKey::Integer).collect()).unwrap();
        let columns = cols.into_iter().map(|(n, v)| Column::numeric(n, v)).collect();
        EvaluationTable::new(index, columns, periods()).unwrap()
    }

    fn full() -> EvaluationTable {
        eval(vec![
            ("observed", vec![Some(1.0), Some(2.0), Some(5.0), Some(6.0)]),
            ("posterior_mean", vec![Some(1.1), Some(1.9), Some(3.0), Some(3.5)]),
            ("posterior_lower", vec![None, None, Some(2.0), Some(2.5)]),
            ("posterior_upper", vec![None, None, Some(4.0), Some(4.5)]),
            ("posterior_std", vec![None, None, Some(0.5), Some(0.5)]),
            ("cumulative_effects_mean", vec![None, None, Some(2.0), Some(4.5)]),
            ("cumulative_effects_lower", vec![None, None, Some(1.0), Some(3.0)]),
            ("cumulative_effects_upper", vec![None, None, Some(3.0), Some(6.0)]),
        ])
    }

    #[test]
    fn invalid_component_names_the_allowed_set() {
        let err = "invalid".parse::<Component>().unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(err.to_string().contains("{lines, bands, std}"));
        assert_eq!("std".parse::<Component>().unwrap(), Component::Std);
    }

    #[test]
    fn lines_melt_one_row_per_column_and_time() {
        let rows = extract_lines(&full()).unwrap();
        // observed, posterior_mean, cumulative_effects_mean over 4 steps
        assert_eq!(rows.len(), 12);
        let cum: Vec<&LineRow> = rows
            .iter()
            .filter(|r| r.scale == Scale::CumulativeEffects)
            .collect();
        assert_eq!(cum.len(), 4);
        assert!(cum.iter().all(|r| r.stat == LineStat::Mean));
        assert_eq!(cum[3].value, Some(4.5));
    }

    #[test]
    fn quantile_bands_pivot_lower_and_upper_together() {
        let rows = extract_quantile_bands(&full()).unwrap();
        assert_eq!(rows.len(), 4);
        let first = &rows[0];
        assert_eq!(first.scale, Scale::Original);
        assert_eq!(first.time, IndexKey::Integer(2));
        assert_eq!((first.lower, first.upper), (Some(2.0), Some(4.0)));
        assert!(rows.iter().all(|r| r.band_method == BandMethod::Quantiles));
    }

    #[test]
    fn std_bands_use_normal_critical_value() {
        let rows = extract_std_bands(&full(), 0.05).unwrap();
        assert_eq!(rows.len(), 2);
        let z = 1.959963984540054;
        assert!((rows[0].lower.unwrap() - (3.0 - z * 0.5)).abs() < 1e-9);
        assert!((rows[0].upper.unwrap() - (3.0 + z * 0.5)).abs() < 1e-9);
        assert!(rows.iter().all(|r| r.band_method == BandMethod::Std));
    }

    #[test]
    fn std_band_without_mean_is_a_reshape_error() {
        let t = eval(vec![
            ("observed", vec![Some(1.0); 4]),
            ("point_effects_std", vec![Some(0.1); 4]),
        ]);
        assert!(matches!(extract_std_bands(&t, 0.05), Err(AppError::Reshape(_))));
    }

    #[test]
    fn missing_component_columns_are_reported() {
        let t = eval(vec![("observed", vec![Some(1.0); 4])]);
        assert!(matches!(
            extract_component(&t, Component::Bands, 0.05),
            Err(AppError::Reshape(_))
        ));
        assert!(matches!(
            extract_component(&t, Component::Std, 0.05),
            Err(AppError::Reshape(_))
        ));
        assert_eq!(extract_component(&t, Component::Lines, 0.05).unwrap().len(), 4);
    }

    #[test]
    fn bad_alpha_is_rejected_before_reshaping() {
        assert!(matches!(
            extract_std_bands(&full(), 1.5),
            Err(AppError::InvalidArgument(_))
        ));
    }
}

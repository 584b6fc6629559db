//! Canonical long-form plot frame.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{BandMethod, IndexKey, LineStat, Periods, Scale, Statistic};
use crate::error::Result;

use super::component::{BandRow, extract_lines, extract_quantile_bands, extract_std_bands};
use super::schema::EvaluationTable;

/// One `(time, scale, stat)` point estimate, joined with at most one band.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRow {
    pub time: IndexKey,
    pub scale: Scale,
    pub stat: LineStat,
    pub value: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub band_method: Option<BandMethod>,
    /// Zero-reference line: `None` on the original scale, `0` elsewhere.
    pub zero: Option<f64>,
}

impl PlotRow {
    pub fn scale_pretty(&self) -> &'static str {
        self.scale.pretty()
    }

    pub fn stat_pretty(&self) -> &'static str {
        self.stat.pretty()
    }

    pub fn has_band(&self) -> bool {
        self.band_method.is_some()
    }
}

/// Flat CSV/JSON shape of a [`PlotRow`], with the period columns repeated.
#[derive(Debug, Clone, Serialize)]
pub struct PlotRecord {
    pub time: String,
    pub scale: &'static str,
    pub stat: &'static str,
    pub value: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub band_method: Option<&'static str>,
    pub zero: Option<f64>,
    pub scale_pretty: &'static str,
    pub stat_pretty: &'static str,
    pub pre_period_start: String,
    pub pre_period_end: String,
    pub post_period_start: String,
    pub post_period_end: String,
}

/// Rows are ordered by `(scale, stat, time, band_method)`, which is also the
/// facet and legend order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotFrame {
    periods: Periods,
    rows: Vec<PlotRow>,
}

impl PlotFrame {
    pub fn new(periods: Periods, mut rows: Vec<PlotRow>) -> Self {
        rows.sort_by(|a, b| {
            (a.scale, a.stat, a.time, a.band_method).cmp(&(b.scale, b.stat, b.time, b.band_method))
        });
        Self { periods, rows }
    }

    pub fn periods(&self) -> &Periods {
        &self.periods
    }

    pub fn rows(&self) -> &[PlotRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one scale, in frame order.
    pub fn scale_rows(&self, scale: Scale) -> impl Iterator<Item = &PlotRow> {
        self.rows.iter().filter(move |r| r.scale == scale)
    }

    pub fn records(&self) -> Vec<PlotRecord> {
        let p = &self.periods;
        self.rows
            .iter()
            .map(|row| PlotRecord {
                time: row.time.to_string(),
                scale: row.scale.as_str(),
                stat: row.stat.as_str(),
                value: row.value,
                lower: row.lower,
                upper: row.upper,
                band_method: row.band_method.map(BandMethod::as_str),
                zero: row.zero,
                scale_pretty: row.scale_pretty(),
                stat_pretty: row.stat_pretty(),
                pre_period_start: p.pre.start.to_string(),
                pre_period_end: p.pre.end.to_string(),
                post_period_start: p.post.start.to_string(),
                post_period_end: p.post.end.to_string(),
            })
            .collect()
    }
}

/// Assemble the canonical plot frame.
///
/// Lines are always required. Quantile bands are added when any `lower`/`upper`
/// column exists, std bands when any `std` column exists. Lines are left-joined
/// with the bands on `(time, scale)`, so a line row with two band sources
/// appears once per `band_method` and a line row with none keeps empty bounds.
pub fn build_plot_frame(table: &EvaluationTable, alpha: f64) -> Result<PlotFrame> {
    let lines = extract_lines(table)?;

    let schema = table.schema();
    let mut bands = Vec::new();
    if schema.has_statistic(Statistic::Lower) || schema.has_statistic(Statistic::Upper) {
        bands.extend(extract_quantile_bands(table)?);
    }
    if schema.has_statistic(Statistic::Std) {
        bands.extend(extract_std_bands(table, alpha)?);
    }
    debug!(lines = lines.len(), bands = bands.len(), "extracted plot components");

    let mut by_key: HashMap<(IndexKey, Scale), Vec<&BandRow>> = HashMap::new();
    for band in &bands {
        by_key.entry((band.time, band.scale)).or_default().push(band);
    }

    let mut rows = Vec::with_capacity(lines.len());
    for line in &lines {
        let zero = (line.scale != Scale::Original).then_some(0.0);
        let base = PlotRow {
            time: line.time,
            scale: line.scale,
            stat: line.stat,
            value: line.value,
            lower: None,
            upper: None,
            band_method: None,
            zero,
        };
        match by_key.get(&(line.time, line.scale)) {
            Some(matches) => rows.extend(matches.iter().map(|band| PlotRow {
                lower: band.lower,
                upper: band.upper,
                band_method: Some(band.band_method),
                ..base.clone()
            })),
            None => rows.push(base),
        }
    }

    let frame = PlotFrame::new(*table.periods(), rows);
    info!(rows = frame.len(), "assembled plot frame");
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::{Column, Period, TimeIndex};

    fn table(cols: Vec<(&str, Vec<Option<f64>>)>) -> EvaluationTable {
        let index = TimeIndex::new((0..4).map(IndexKey::Integer).collect()).unwrap();
        let periods = Periods {
            pre: Period {
                start: IndexKey::Integer(0),
                end: IndexKey::Integer(1),
            },
            post: Period {
                start: IndexKey::Integer(2),
                end: IndexKey::Integer(3),
            },
        };
        let columns = cols.into_iter().map(|(n, v)| Column::numeric(n, v)).collect();
        EvaluationTable::new(index, columns, periods).unwrap()
    }

    fn post(a: f64, b: f64) -> Vec<Option<f64>> {
        vec![None, None, Some(a), Some(b)]
    }

    fn both_band_sources() -> EvaluationTable {
        table(vec![
            ("observed", vec![Some(1.0), Some(2.0), Some(5.0), Some(6.0)]),
            ("posterior_mean", vec![Some(1.0), Some(2.0), Some(3.0), Some(3.0)]),
            ("posterior_lower", post(2.0, 2.0)),
            ("posterior_upper", post(4.0, 4.0)),
            ("posterior_std", post(0.5, 0.5)),
            ("point_effects_mean", vec![Some(0.0), Some(0.0), Some(2.0), Some(3.0)]),
            ("point_effects_lower", post(1.0, 2.0)),
            ("point_effects_upper", post(3.0, 4.0)),
            ("point_effects_std", post(0.5, 0.5)),
        ])
    }

    #[test]
    fn zero_reference_is_null_only_on_original_scale() {
        let frame = build_plot_frame(&both_band_sources(), 0.05).unwrap();
        for row in frame.rows() {
            match row.scale {
                Scale::Original => assert_eq!(row.zero, None),
                _ => assert_eq!(row.zero, Some(0.0)),
            }
        }
    }

    #[test]
    fn two_band_methods_duplicate_rows_inside_the_post_period() {
        let frame = build_plot_frame(&both_band_sources(), 0.05).unwrap();
        let at = |t: i64, scale: Scale, stat: LineStat| {
            frame
                .rows()
                .iter()
                .filter(|r| r.time == IndexKey::Integer(t) && r.scale == scale && r.stat == stat)
                .collect::<Vec<_>>()
        };
        let inside = at(2, Scale::PointEffects, LineStat::Mean);
        assert_eq!(inside.len(), 2);
        assert_eq!(inside[0].band_method, Some(BandMethod::Quantiles));
        assert_eq!(inside[1].band_method, Some(BandMethod::Std));
        assert_eq!(inside[0].value, inside[1].value);

        let outside = at(0, Scale::PointEffects, LineStat::Mean);
        assert_eq!(outside.len(), 1);
        assert_eq!((outside[0].lower, outside[0].upper, outside[0].band_method), (None, None, None));
    }

    #[test]
    fn one_row_per_line_triple_and_method() {
        let frame = build_plot_frame(&both_band_sources(), 0.05).unwrap();
        let mut seen = HashSet::new();
        for row in frame.rows() {
            assert!(seen.insert((row.time, row.scale, row.stat, row.band_method)));
        }
        let triples: HashSet<_> = frame.rows().iter().map(|r| (r.time, r.scale, r.stat)).collect();
        // observed + original mean + pointwise mean, 4 steps each
        assert_eq!(triples.len(), 12);
    }

    #[test]
    fn std_bands_are_optional() {
        let t = table(vec![
            ("observed", vec![Some(1.0); 4]),
            ("posterior_mean", vec![Some(1.0); 4]),
            ("posterior_lower", post(0.0, 0.0)),
            ("posterior_upper", post(2.0, 2.0)),
        ]);
        let frame = build_plot_frame(&t, 0.05).unwrap();
        assert!(frame.rows().iter().all(|r| r.band_method != Some(BandMethod::Std)));
        assert_eq!(frame.len(), 8);
    }

    #[test]
    fn rows_follow_legend_order() {
        let frame = build_plot_frame(&both_band_sources(), 0.05).unwrap();
        let first = &frame.rows()[0];
        assert_eq!((first.scale_pretty(), first.stat_pretty()), ("Original", "Observed"));
        let last = frame.rows().last().unwrap();
        assert_eq!(last.scale, Scale::PointEffects);
    }

    #[test]
    fn records_repeat_period_bounds() {
        let frame = build_plot_frame(&both_band_sources(), 0.05).unwrap();
        let records = frame.records();
        assert_eq!(records.len(), frame.len());
        assert!(records.iter().all(|r| r.pre_period_end == "1" && r.post_period_start == "2"));
        assert_eq!(records[0].band_method, None);
    }
}

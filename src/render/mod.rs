//! Rendering backends for a [`PlotFrame`].
//!
//! Both backends consume the same selected rows: one row per
//! `(time, scale, stat)` carrying the requested band method, or no band.

pub mod ascii;
pub mod options;
pub mod vega;

pub use options::*;

use tracing::debug;

use crate::domain::{IndexKey, LineStat, Periods};
use crate::error::{BoundName, Result};
use crate::plotdata::{PlotFrame, PlotRow};

/// A vertical period-boundary marker.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodMarker {
    pub bound: BoundName,
    pub at: IndexKey,
    pub label: String,
}

/// Render `frame` with the configured backend.
pub fn render(frame: &PlotFrame, options: &RenderOptions) -> Result<String> {
    options.validate()?;
    let selected = select_rows(frame, options);
    debug!(
        backend = %options.backend,
        rows = selected.len(),
        "rendering plot frame"
    );
    match options.backend {
        Backend::Ascii => Ok(ascii::render(&selected, options)),
        Backend::VegaLite => vega::render(&selected, options),
    }
}

/// Keep exactly one band method per `(time, scale, stat)`.
///
/// The requested method wins; where it has no band, a single row with the
/// bounds cleared is kept. Median rows survive only with `show_median`.
pub fn select_rows(frame: &PlotFrame, options: &RenderOptions) -> PlotFrame {
    let mut rows = Vec::new();
    for group in frame
        .rows()
        .chunk_by(|a, b| (a.time, a.scale, a.stat) == (b.time, b.scale, b.stat))
    {
        if group[0].stat == LineStat::Median && !options.show_median {
            continue;
        }
        match group
            .iter()
            .find(|r| r.band_method == Some(options.band_method))
        {
            Some(row) => rows.push(row.clone()),
            None => rows.push(PlotRow {
                lower: None,
                upper: None,
                band_method: None,
                ..group[0].clone()
            }),
        }
    }
    PlotFrame::new(*frame.periods(), rows)
}

/// Period markers worth drawing for data spanning `times`.
///
/// The post-period start is always drawn. The pre-period start needs data
/// before it, the pre-period end needs data strictly between the periods, and
/// the post-period end needs data after it.
pub fn period_markers(times: &[IndexKey], periods: &Periods, labels: &LegendLabels) -> Vec<PeriodMarker> {
    let mut markers = Vec::new();
    if times.iter().any(|t| *t < periods.pre.start) {
        markers.push(PeriodMarker {
            bound: BoundName::PreStart,
            at: periods.pre.start,
            label: labels.pre_period_start.clone(),
        });
    }
    if times.iter().any(|t| *t > periods.pre.end && *t < periods.post.start) {
        markers.push(PeriodMarker {
            bound: BoundName::PreEnd,
            at: periods.pre.end,
            label: labels.pre_period_end.clone(),
        });
    }
    markers.push(PeriodMarker {
        bound: BoundName::PostStart,
        at: periods.post.start,
        label: labels.post_period_start.clone(),
    });
    if times.iter().any(|t| *t > periods.post.end) {
        markers.push(PeriodMarker {
            bound: BoundName::PostEnd,
            at: periods.post.end,
            label: labels.post_period_end.clone(),
        });
    }
    markers
}

/// Distinct times of the frame, ascending.
fn frame_times(frame: &PlotFrame) -> Vec<IndexKey> {
    let mut times: Vec<IndexKey> = frame.rows().iter().map(|r| r.time).collect();
    times.sort();
    times.dedup();
    times
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BandMethod, Period, Scale};

    fn periods() -> Periods {
        Periods {
            pre: Period {
                start: IndexKey::Integer(2),
                end: IndexKey::Integer(4),
            },
            post: Period {
                start: IndexKey::Integer(6),
                end: IndexKey::Integer(8),
            },
        }
    }

    fn row(t: i64, stat: LineStat, band: Option<BandMethod>) -> PlotRow {
        PlotRow {
            time: IndexKey::Integer(t),
            scale: Scale::PointEffects,
            stat,
            value: Some(1.0),
            lower: band.map(|_| 0.0),
            upper: band.map(|_| 2.0),
            band_method: band,
            zero: Some(0.0),
        }
    }

    fn frame() -> PlotFrame {
        PlotFrame::new(
            periods(),
            vec![
                row(1, LineStat::Mean, None),
                row(6, LineStat::Mean, Some(BandMethod::Quantiles)),
                row(6, LineStat::Mean, Some(BandMethod::Std)),
                row(7, LineStat::Mean, Some(BandMethod::Quantiles)),
                row(6, LineStat::Median, Some(BandMethod::Quantiles)),
            ],
        )
    }

    #[test]
    fn keeps_requested_band_method() {
        let options = RenderOptions {
            band_method: BandMethod::Std,
            ..RenderOptions::default()
        };
        let selected = select_rows(&frame(), &options);
        // median dropped; one row per (time, stat)
        assert_eq!(selected.len(), 3);
        let at6 = &selected.rows()[1];
        assert_eq!(at6.band_method, Some(BandMethod::Std));
        let at7 = &selected.rows()[2];
        assert_eq!((at7.band_method, at7.lower, at7.upper), (None, None, None));
    }

    #[test]
    fn median_only_on_request() {
        let options = RenderOptions {
            show_median: true,
            ..RenderOptions::default()
        };
        let selected = select_rows(&frame(), &options);
        assert_eq!(selected.len(), 4);
        assert!(selected.rows().iter().any(|r| r.stat == LineStat::Median));
    }

    #[test]
    fn markers_depend_on_data_extent() {
        let labels = LegendLabels::default();
        let inside: Vec<IndexKey> = (2..=8).map(IndexKey::Integer).collect();
        let bounds: Vec<BoundName> = period_markers(&inside, &periods(), &labels)
            .into_iter()
            .map(|m| m.bound)
            .collect();
        assert_eq!(bounds, vec![BoundName::PreEnd, BoundName::PostStart]);

        let contiguous = [2, 3, 4, 6, 7, 8].map(IndexKey::Integer);
        let bounds: Vec<BoundName> = period_markers(&contiguous, &periods(), &labels)
            .into_iter()
            .map(|m| m.bound)
            .collect();
        assert_eq!(bounds, vec![BoundName::PostStart]);

        let wide: Vec<IndexKey> = (0..=10).map(IndexKey::Integer).collect();
        assert_eq!(period_markers(&wide, &periods(), &labels).len(), 4);
    }
}

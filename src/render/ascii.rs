//! ASCII plotting for terminal output.
//!
//! Three stacked panels (original, pointwise, cumulative) share one x axis.
//! The grid is fixed-size so output is deterministic, which keeps golden
//! tests simple.
//!
//! Glyphs, highest priority first:
//! - observed points: `o`
//! - posterior mean / effect line: `-`
//! - period markers: `|`
//! - zero reference: `=`
//! - uncertainty band: `:`

use crate::domain::{IndexKey, LineStat, Scale};
use crate::plotdata::{PlotFrame, PlotRow};

use super::options::{RenderOptions, YFormatter};
use super::{PeriodMarker, frame_times, period_markers};

/// Approximate pixels per character cell.
const PX_PER_COL: u32 = 8;
const PX_PER_ROW: u32 = 20;

struct PanelStyle<'a> {
    label: &'a str,
    legend: String,
    unit: &'a str,
    formatter: YFormatter,
}

pub fn render(frame: &PlotFrame, options: &RenderOptions) -> String {
    let width = ((options.chart_width / PX_PER_COL) as usize).max(10);
    let height = ((options.chart_height / PX_PER_ROW) as usize).max(5);

    let times = frame_times(frame);
    let (x_min, x_max) = x_range(&times).unwrap_or((0.0, 1.0));
    let markers = period_markers(&times, frame.periods(), &options.legend_labels);
    let labels = &options.legend_labels;

    let mut out = String::new();
    if !options.title.is_empty() {
        out.push_str(&options.title);
        out.push('\n');
    }
    for (panel, scale) in Scale::ALL.into_iter().enumerate() {
        let legend = match scale {
            Scale::Original => format!("o {}  - {}", labels.observed, labels.mean),
            Scale::PointEffects => format!("- {}", labels.pointwise),
            Scale::CumulativeEffects => format!("- {}", labels.cumulative),
        };
        let style = PanelStyle {
            label: options
                .y_labels
                .get(panel)
                .map(String::as_str)
                .unwrap_or(scale.pretty()),
            legend,
            unit: options.y_formatter_unit.for_panel(panel),
            formatter: options.y_formatter,
        };
        let rows: Vec<&PlotRow> = frame.scale_rows(scale).collect();
        out.push_str(&render_panel(&rows, &style, &markers, x_min, x_max, width, height));
    }

    match (times.first(), times.last()) {
        (Some(first), Some(last)) => {
            out.push_str(&format!("{}: {first} .. {last}\n", options.x_label));
        }
        _ => out.push_str(&format!("{}: (no data)\n", options.x_label)),
    }
    for m in &markers {
        out.push_str(&format!("| {} = {}\n", m.label, m.at));
    }
    out
}

fn render_panel(
    rows: &[&PlotRow],
    style: &PanelStyle<'_>,
    markers: &[PeriodMarker],
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
) -> String {
    let Some((y_lo, y_hi)) = y_range(rows) else {
        return format!("{} | (no data)\n", style.label);
    };
    let (y_min, y_max) = pad_range(y_lo, y_hi, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let to_x = |t: &IndexKey| map_x(t.as_f64(), x_min, x_max, width);
    let to_y = |y: f64| map_y(y, y_min, y_max, height);

    for r in rows.iter().filter(|r| r.stat == LineStat::Observed) {
        if let Some(v) = r.value {
            grid[to_y(v)][to_x(&r.time)] = 'o';
        }
    }

    let mean: Vec<&PlotRow> = rows
        .iter()
        .copied()
        .filter(|r| r.stat == LineStat::Mean)
        .collect();
    let line: Vec<(usize, usize)> = mean
        .iter()
        .filter_map(|r| r.value.map(|v| (to_x(&r.time), to_y(v))))
        .collect();
    draw_polyline(&mut grid, &line, '-');

    for m in markers {
        let x = to_x(&m.at);
        fill_column(&mut grid, x, 0, height - 1, '|');
    }

    if let Some(zero) = rows.iter().find_map(|r| r.zero) {
        let y = to_y(zero);
        draw_line(&mut grid, 0, y, width - 1, y, '=');
    }

    let band: Vec<Option<(f64, f64, f64)>> = mean
        .iter()
        .map(|r| match (r.lower, r.upper) {
            (Some(lo), Some(hi)) => Some((r.time.as_f64(), lo, hi)),
            _ => None,
        })
        .collect();
    for (i, point) in band.iter().enumerate() {
        let Some((t, lo, hi)) = *point else {
            continue;
        };
        fill_column(&mut grid, map_x(t, x_min, x_max, width), to_y(hi), to_y(lo), ':');
        if let Some(Some((t1, lo1, hi1))) = band.get(i + 1).copied() {
            let (xa, xb) = (map_x(t, x_min, x_max, width), map_x(t1, x_min, x_max, width));
            for x in xa + 1..xb {
                let u = (x - xa) as f64 / (xb - xa) as f64;
                let l = lo + u * (lo1 - lo);
                let h = hi + u * (hi1 - hi);
                fill_column(&mut grid, x, to_y(h), to_y(l), ':');
            }
        }
    }

    let mut out = format!(
        "{} | y=[{}, {}] | {}\n",
        style.label,
        style.formatter.format(y_lo, style.unit),
        style.formatter.format(y_hi, style.unit),
        style.legend
    );
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn x_range(times: &[IndexKey]) -> Option<(f64, f64)> {
    let (first, last) = (times.first()?.as_f64(), times.last()?.as_f64());
    (last > first).then_some((first, last))
}

/// Data range of a panel: values, band bounds and the zero line.
fn y_range(rows: &[&PlotRow]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for r in rows {
        for y in [r.value, r.lower, r.upper, r.zero].into_iter().flatten() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if !(min_y.is_finite() && max_y.is_finite()) {
        return None;
    }
    if max_y > min_y {
        Some((min_y, max_y))
    } else {
        Some((min_y - 0.5, max_y + 0.5))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(grid: &mut [Vec<char>], points: &[(usize, usize)], ch: char) {
    let mut prev: Option<(usize, usize)> = None;
    for &(x, y) in points {
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, y, ch),
            None => draw_line(grid, x, y, x, y, ch),
        }
        prev = Some((x, y));
    }
}

/// Fill rows `top..=bottom` of column `x` where still blank.
fn fill_column(grid: &mut [Vec<char>], x: usize, top: usize, bottom: usize, ch: char) {
    for row in grid.iter_mut().take(bottom + 1).skip(top) {
        if let Some(cell) = row.get_mut(x) {
            if *cell == ' ' {
                *cell = ch;
            }
        }
    }
}

/// Integer line drawing (Bresenham-ish). Only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BandMethod, Period, Periods};
    use crate::error::BoundName;

    fn pointwise(t: i64, value: f64, band: Option<(f64, f64)>) -> PlotRow {
        PlotRow {
            time: IndexKey::Integer(t),
            scale: Scale::PointEffects,
            stat: LineStat::Mean,
            value: Some(value),
            lower: band.map(|b| b.0),
            upper: band.map(|b| b.1),
            band_method: band.map(|_| BandMethod::Quantiles),
            zero: Some(0.0),
        }
    }

    #[test]
    fn panel_golden_snapshot_small() {
        let rows = [
            pointwise(0, 0.0, None),
            pointwise(1, 0.0, None),
            pointwise(2, 0.0, None),
            pointwise(3, 2.0, Some((1.0, 3.0))),
            pointwise(4, 2.0, Some((1.0, 3.0))),
        ];
        let refs: Vec<&PlotRow> = rows.iter().collect();
        let markers = [
            PeriodMarker {
                bound: BoundName::PreEnd,
                at: IndexKey::Integer(1),
                label: "end".into(),
            },
            PeriodMarker {
                bound: BoundName::PostStart,
                at: IndexKey::Integer(3),
                label: "start".into(),
            },
        ];
        let style = PanelStyle {
            label: "Pointwise Effect",
            legend: "- Pointwise".into(),
            unit: "",
            formatter: YFormatter::Plain,
        };

        let txt = render_panel(&refs, &style, &markers, 0.0, 4.0, 10, 5);
        let expected = concat!(
            "Pointwise Effect | y=[0, 3] | - Pointwise\n",
            "  |    |::\n",
            "  |    ---\n",
            "  |   -|::\n",
            "  |   -|::\n",
            "------=|==\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn full_plot_has_three_panels_and_marker_legend() {
        let periods = Periods {
            pre: Period {
                start: IndexKey::Integer(0),
                end: IndexKey::Integer(1),
            },
            post: Period {
                start: IndexKey::Integer(3),
                end: IndexKey::Integer(4),
            },
        };
        let mut rows = vec![
            pointwise(0, 0.0, None),
            pointwise(4, 2.0, Some((1.0, 3.0))),
        ];
        for (t, v) in [(0, 10.0), (4, 14.0)] {
            rows.push(PlotRow {
                time: IndexKey::Integer(t),
                scale: Scale::Original,
                stat: LineStat::Observed,
                value: Some(v),
                lower: None,
                upper: None,
                band_method: None,
                zero: None,
            });
        }
        let frame = PlotFrame::new(periods, rows);
        let options = RenderOptions {
            y_formatter: YFormatter::Plain,
            ..RenderOptions::default()
        };

        let txt = render(&frame, &options);
        assert!(txt.starts_with("Interrupted Time Series Analysis Over Time\n"));
        assert!(txt.contains("Observed | y=[10, 14] | o Observed  - Mean\n"));
        assert!(txt.contains("Pointwise Effect | y=[0, 3]"));
        assert!(txt.contains("Cumulative Effect | (no data)\n"));
        assert!(txt.contains("Date: 0 .. 4\n"));
        assert!(txt.ends_with("| Post-Period Start = 3\n"));
        assert!(txt.contains('o'));
    }

    #[test]
    fn missing_panel_labels_fall_back_to_scale_names() {
        let frame = PlotFrame::new(
            Periods {
                pre: Period {
                    start: IndexKey::Integer(0),
                    end: IndexKey::Integer(1),
                },
                post: Period {
                    start: IndexKey::Integer(2),
                    end: IndexKey::Integer(3),
                },
            },
            vec![pointwise(2, 1.0, None)],
        );
        let options = RenderOptions {
            y_labels: vec!["Observed".into()],
            ..RenderOptions::default()
        };
        let txt = render(&frame, &options);
        assert!(txt.contains("Observed | (no data)\n"));
        assert!(txt.contains("Pointwise | y=["));
        assert!(txt.contains("Cumulative | (no data)\n"));
    }
}

//! Formatted terminal summaries.
//!
//! Formatting lives in one place so the preparation and reshaping code stays
//! free of presentation concerns, and output changes stay localized.

use crate::domain::{BandMethod, Scale};
use crate::plotdata::PlotFrame;
use crate::prep::Dataset;

/// Summary of a prepared dataset.
pub fn format_prepare_summary(dataset: &Dataset) -> String {
    let mut out = String::new();
    let periods = dataset.periods();
    let target = dataset.pre_target();

    out.push_str("=== impact - dataset preparation ===\n");
    out.push_str(&format!("Target: {}\n", dataset.target()));
    if dataset.features().is_empty() {
        out.push_str("Features: (none)\n");
    } else {
        out.push_str(&format!(
            "Features: {} ({})\n",
            dataset.features().len(),
            dataset.features().join(", ")
        ));
    }
    out.push_str(&format!(
        "Pre-period: {} .. {} | rows={} | observed={} missing={}\n",
        periods.pre.start,
        periods.pre.end,
        dataset.pre_data().len(),
        target.observed_count(),
        target.len() - target.observed_count(),
    ));
    out.push_str(&format!(
        "Post-period: {} .. {}\n",
        periods.post.start, periods.post.end
    ));
    out.push_str(&format!(
        "Forecast steps: {} | after-pre rows kept={}\n",
        dataset.num_steps_forecast(),
        dataset.normalized_after_pre_data().len(),
    ));

    match dataset.scaler() {
        Some(scaler) => {
            out.push_str("\nStandardization (pre-period mean / std):\n");
            for c in scaler.columns() {
                out.push_str(&format!("  {:<16} {:>12.4} {:>12.4}\n", c.name, c.mean, c.std));
            }
        }
        None => out.push_str("\nStandardization: off\n"),
    }
    out
}

/// Row counts of a plot frame per scale and band method.
pub fn format_plot_frame_summary(frame: &PlotFrame) -> String {
    let mut out = String::new();
    out.push_str(&format!("Plot frame: {} rows\n", frame.len()));
    for scale in Scale::ALL {
        let rows: Vec<_> = frame.scale_rows(scale).collect();
        if rows.is_empty() {
            continue;
        }
        let count = |m: Option<BandMethod>| rows.iter().filter(|r| r.band_method == m).count();
        out.push_str(&format!(
            "  {:<10} rows={:<6} quantiles={:<6} std={:<6} no-band={}\n",
            scale.pretty(),
            rows.len(),
            count(Some(BandMethod::Quantiles)),
            count(Some(BandMethod::Std)),
            count(None),
        ));
    }
    out
}

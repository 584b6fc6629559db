//! Command-line parsing for the causal-impact prep pipeline.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the preparation/reshaping code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{BandMethod, IndexKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "impact", version, about = "Causal-impact data preparation and plot frames")]
pub struct Cli {
    /// Log pipeline stages to stderr (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate periods, standardize, and write the model-ready dataset.
    Prepare(PrepareArgs),
    /// Reshape a model evaluation CSV into the long-form plot frame.
    PlotData(PlotDataArgs),
    /// Render an evaluation CSV as a three-panel chart.
    Plot(PlotArgs),
    /// Write a seeded synthetic input series and its exact evaluation table.
    Demo(DemoArgs),
}

/// Options for `impact prepare`.
#[derive(Debug, Parser, Clone)]
pub struct PrepareArgs {
    /// Input CSV; the first column is the time index.
    #[arg(short, long, value_name = "CSV")]
    pub input: PathBuf,

    /// First index entry of the pre-intervention period.
    #[arg(long)]
    pub pre_start: String,

    /// Last index entry of the pre-intervention period.
    #[arg(long)]
    pub pre_end: String,

    /// First index entry of the post-intervention period.
    #[arg(long)]
    pub post_start: String,

    /// Last index entry of the post-intervention period.
    #[arg(long)]
    pub post_end: String,

    /// Target column (defaults to the first data column).
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip standardization; normalized slices equal the raw slices.
    #[arg(long)]
    pub no_standardize: bool,

    /// Keep rows with missing values in the normalized after-pre slice.
    #[arg(long)]
    pub keep_post_missing: bool,

    /// Index type (inferred from the first row when omitted).
    #[arg(long, value_enum)]
    pub index_kind: Option<IndexKind>,

    /// Output directory for slices, features and manifest.
    #[arg(short, long, default_value = "prepared")]
    pub out_dir: PathBuf,
}

/// Options for `impact plot-data`.
#[derive(Debug, Parser, Clone)]
pub struct PlotDataArgs {
    /// Evaluation CSV produced by the model.
    #[arg(short, long, value_name = "CSV")]
    pub evaluation: PathBuf,

    /// Significance level for std-derived bands.
    #[arg(long, default_value_t = 0.05)]
    pub alpha: f64,

    /// Index type (inferred from the first row when omitted).
    #[arg(long, value_enum)]
    pub index_kind: Option<IndexKind>,

    /// Write the plot frame here instead of stdout.
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

/// Options for `impact plot`.
///
/// Flags override the corresponding keys of `--options`.
#[derive(Debug, Parser, Clone)]
pub struct PlotArgs {
    /// Evaluation CSV produced by the model.
    #[arg(short, long, value_name = "CSV")]
    pub evaluation: PathBuf,

    /// Renderer options JSON.
    #[arg(long, value_name = "JSON")]
    pub options: Option<PathBuf>,

    /// Rendering backend (ascii, vega-lite).
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Which uncertainty band to draw.
    #[arg(long, value_enum)]
    pub band_method: Option<BandMethod>,

    /// Include the posterior median line.
    #[arg(long)]
    pub show_median: bool,

    /// Significance level for std-derived bands.
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Index type (inferred from the first row when omitted).
    #[arg(long, value_enum)]
    pub index_kind: Option<IndexKind>,

    /// Write the rendered chart here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Options for `impact demo`.
#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Output directory for `input.csv` and `evaluation.csv`.
    #[arg(short, long, default_value = "demo")]
    pub out_dir: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Pre-intervention steps.
    #[arg(long, default_value_t = 70)]
    pub n_pre: usize,

    /// Post-intervention steps.
    #[arg(long, default_value_t = 30)]
    pub n_post: usize,

    /// Lift added to the target over the post-period.
    #[arg(long, default_value_t = 5.0)]
    pub effect: f64,

    /// Observation noise standard deviation.
    #[arg(long, default_value_t = 1.0)]
    pub noise_sd: f64,

    /// Significance level of the evaluation intervals.
    #[arg(long, default_value_t = 0.05)]
    pub alpha: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prepare() {
        let cli = Cli::parse_from([
            "impact",
            "prepare",
            "--input",
            "data.csv",
            "--pre-start",
            "2024-01-01",
            "--pre-end",
            "2024-03-10",
            "--post-start",
            "2024-03-11",
            "--post-end",
            "2024-04-09",
            "--no-standardize",
        ]);
        let Command::Prepare(args) = cli.command else {
            panic!("expected prepare");
        };
        assert_eq!(args.pre_end, "2024-03-10");
        assert!(args.no_standardize);
        assert!(!args.keep_post_missing);
        assert_eq!(args.out_dir, PathBuf::from("prepared"));
    }

    #[test]
    fn parses_plot_overrides() {
        let cli = Cli::parse_from([
            "impact",
            "-v",
            "plot",
            "-e",
            "eval.csv",
            "--backend",
            "vega-lite",
            "--band-method",
            "std",
        ]);
        assert!(cli.verbose);
        let Command::Plot(args) = cli.command else {
            panic!("expected plot");
        };
        assert_eq!(args.backend.as_deref(), Some("vega-lite"));
        assert_eq!(args.band_method, Some(BandMethod::Std));
        assert_eq!(args.alpha, None);
    }
}

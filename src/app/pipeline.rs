//! Shared pipeline logic behind the CLI subcommands.
//!
//! Each `run_*` function does the full work of one subcommand and returns its
//! outputs; `app.rs` only turns arguments into configs and prints results.
//!
//! prepare:   CSV -> table -> Dataset -> slices/features/manifest on disk
//! plot-data: evaluation CSV -> EvaluationTable -> PlotFrame
//! plot:      evaluation CSV -> PlotFrame -> rendered chart
//! demo:      seeded sample -> input CSV + evaluation CSV

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::data::{SampleConfig, SampleData, generate_sample};
use crate::domain::{BandMethod, IndexKind, PeriodBound};
use crate::error::{AppError, Result};
use crate::io::{
    read_evaluation_csv, read_table_csv, write_evaluation_csv, write_feature_matrix_csv,
    write_manifest_json, write_table_csv,
};
use crate::plotdata::{PlotFrame, build_plot_frame};
use crate::prep::{Dataset, DatasetOptions};
use crate::render::{Backend, RenderOptions, render};

pub const NORMALIZED_PRE_FILE: &str = "normalized_pre.csv";
pub const NORMALIZED_AFTER_PRE_FILE: &str = "normalized_after_pre.csv";
pub const FEATURES_FILE: &str = "features.csv";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const DEMO_INPUT_FILE: &str = "input.csv";
pub const DEMO_EVALUATION_FILE: &str = "evaluation.csv";

#[derive(Debug, Clone)]
pub struct PrepareConfig {
    pub input: PathBuf,
    pub pre: (PeriodBound, PeriodBound),
    pub post: (PeriodBound, PeriodBound),
    pub options: DatasetOptions,
    pub index_kind: Option<IndexKind>,
    pub out_dir: PathBuf,
}

/// Outputs of `impact prepare`.
#[derive(Debug, Clone)]
pub struct PrepareOutput {
    pub dataset: Dataset,
    pub written: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PlotDataConfig {
    pub evaluation: PathBuf,
    pub alpha: f64,
    pub index_kind: Option<IndexKind>,
}

#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub evaluation: PathBuf,
    pub index_kind: Option<IndexKind>,
    pub render: RenderOptions,
}

/// Flag overrides applied on top of a (possibly file-loaded) [`RenderOptions`].
#[derive(Debug, Clone, Default)]
pub struct RenderOverrides {
    pub backend: Option<Backend>,
    pub band_method: Option<BandMethod>,
    pub show_median: bool,
    pub alpha: Option<f64>,
}

impl RenderOverrides {
    pub fn apply(&self, options: &mut RenderOptions) {
        if let Some(backend) = self.backend {
            options.backend = backend;
        }
        if let Some(method) = self.band_method {
            options.band_method = method;
        }
        if self.show_median {
            options.show_median = true;
        }
        if let Some(alpha) = self.alpha {
            options.alpha = alpha;
        }
    }
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub out_dir: PathBuf,
    pub sample: SampleConfig,
    pub alpha: f64,
}

/// Outputs of `impact demo`.
#[derive(Debug, Clone)]
pub struct DemoOutput {
    pub sample: SampleData,
    pub input_path: PathBuf,
    pub evaluation_path: PathBuf,
}

/// Build the dataset and write its model-ready pieces into `out_dir`.
///
/// Nothing is written unless the dataset builds.
pub fn run_prepare(config: &PrepareConfig) -> Result<PrepareOutput> {
    let table = read_table_csv(&config.input, config.index_kind)?;
    info!(rows = table.len(), columns = table.columns().len(), "loaded input table");

    let dataset = Dataset::new(table, config.pre.clone(), config.post.clone(), &config.options)?;

    ensure_dir(&config.out_dir)?;
    let mut written = Vec::new();

    let path = config.out_dir.join(NORMALIZED_PRE_FILE);
    write_table_csv(&path, dataset.normalized_pre_data())?;
    written.push(path);

    let path = config.out_dir.join(NORMALIZED_AFTER_PRE_FILE);
    write_table_csv(&path, dataset.normalized_after_pre_data())?;
    written.push(path);

    if let Some(features) = dataset.whole_period_features() {
        let path = config.out_dir.join(FEATURES_FILE);
        write_feature_matrix_csv(&path, features)?;
        written.push(path);
    }

    let path = config.out_dir.join(MANIFEST_FILE);
    write_manifest_json(&path, &dataset.manifest())?;
    written.push(path);

    info!(files = written.len(), dir = %config.out_dir.display(), "wrote prepared dataset");
    Ok(PrepareOutput { dataset, written })
}

pub fn run_plot_data(config: &PlotDataConfig) -> Result<PlotFrame> {
    let table = read_evaluation_csv(&config.evaluation, config.index_kind)?;
    build_plot_frame(&table, config.alpha)
}

/// Load, reshape and render an evaluation table.
pub fn run_plot(config: &PlotConfig) -> Result<String> {
    config.render.validate()?;
    let frame = run_plot_data(&PlotDataConfig {
        evaluation: config.evaluation.clone(),
        alpha: config.render.alpha,
        index_kind: config.index_kind,
    })?;
    render(&frame, &config.render)
}

/// Write the sample input series and the evaluation table an exact model
/// would produce for it.
pub fn run_demo(config: &DemoConfig) -> Result<DemoOutput> {
    let sample = generate_sample(&config.sample)?;
    let evaluation = sample.evaluation(config.alpha)?;

    ensure_dir(&config.out_dir)?;
    let input_path = config.out_dir.join(DEMO_INPUT_FILE);
    write_table_csv(&input_path, &sample.table)?;
    let evaluation_path = config.out_dir.join(DEMO_EVALUATION_FILE);
    write_evaluation_csv(&evaluation_path, &evaluation)?;

    info!(rows = sample.table.len(), seed = config.sample.seed, "wrote demo data");
    Ok(DemoOutput {
        sample,
        input_path,
        evaluation_path,
    })
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::Io(format!("Failed to create directory {}: {e}", dir.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Scale;

    fn demo_into(dir: &Path) -> DemoOutput {
        run_demo(&DemoConfig {
            out_dir: dir.to_path_buf(),
            sample: SampleConfig {
                n_pre: 20,
                n_post: 10,
                ..SampleConfig::default()
            },
            alpha: 0.05,
        })
        .unwrap()
    }

    #[test]
    fn prepare_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let demo = demo_into(dir.path());
        let p = demo.sample.periods;

        let out_dir = dir.path().join("prepared");
        let out = run_prepare(&PrepareConfig {
            input: demo.input_path.clone(),
            pre: (p.pre.start.to_string().into(), p.pre.end.to_string().into()),
            post: (p.post.start.to_string().into(), p.post.end.to_string().into()),
            options: DatasetOptions::default(),
            index_kind: None,
            out_dir: out_dir.clone(),
        })
        .unwrap();

        assert_eq!(out.written.len(), 4);
        for path in &out.written {
            assert!(path.exists(), "{} missing", path.display());
        }
        assert_eq!(out.dataset.num_steps_forecast(), 10);
        assert_eq!(out.dataset.pre_data().len(), 20);
    }

    #[test]
    fn failed_prepare_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let demo = demo_into(dir.path());
        let p = demo.sample.periods;

        let out_dir = dir.path().join("prepared");
        let err = run_prepare(&PrepareConfig {
            input: demo.input_path,
            pre: (p.pre.start.to_string().into(), p.post.start.to_string().into()),
            post: (p.post.start.to_string().into(), p.post.end.to_string().into()),
            options: DatasetOptions::default(),
            index_kind: None,
            out_dir: out_dir.clone(),
        })
        .unwrap_err();

        assert!(matches!(err, AppError::PeriodOverlap(_)));
        assert!(!out_dir.exists());
    }

    #[test]
    fn plot_data_reads_demo_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let demo = demo_into(dir.path());
        let frame = run_plot_data(&PlotDataConfig {
            evaluation: demo.evaluation_path,
            alpha: 0.05,
            index_kind: None,
        })
        .unwrap();
        assert_eq!(frame.periods(), &demo.sample.periods);
        assert!(frame.scale_rows(Scale::CumulativeEffects).all(|r| r.zero == Some(0.0)));
    }

    #[test]
    fn overrides_take_precedence() {
        let mut options = RenderOptions::default();
        RenderOverrides {
            backend: Some(Backend::VegaLite),
            band_method: Some(BandMethod::Std),
            show_median: false,
            alpha: Some(0.1),
        }
        .apply(&mut options);
        assert_eq!(options.backend, Backend::VegaLite);
        assert_eq!(options.band_method, BandMethod::Std);
        assert!(!options.show_median);
        assert_eq!(options.alpha, 0.1);
    }

    #[test]
    fn plot_renders_ascii_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let demo = demo_into(dir.path());
        let chart = run_plot(&PlotConfig {
            evaluation: demo.evaluation_path,
            index_kind: None,
            render: RenderOptions::default(),
        })
        .unwrap();
        assert!(chart.starts_with("Interrupted Time Series Analysis Over Time"));
    }
}

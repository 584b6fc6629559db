//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs logging
//! - turns arguments into pipeline configs
//! - prints summaries and writes outputs

use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use clap::Parser;

use crate::cli::{Command, DemoArgs, PlotArgs, PlotDataArgs, PrepareArgs};
use crate::data::SampleConfig;
use crate::error::{AppError, Result};
use crate::prep::DatasetOptions;
use crate::render::{Backend, RenderOptions};

pub mod pipeline;

use pipeline::{DemoConfig, PlotConfig, PlotDataConfig, PrepareConfig, RenderOverrides};

/// Entry point for the `impact` binary.
pub fn run() -> Result<()> {
    let cli = crate::cli::Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Prepare(args) => handle_prepare(&args),
        Command::PlotData(args) => handle_plot_data(&args),
        Command::Plot(args) => handle_plot(&args),
        Command::Demo(args) => handle_demo(&args),
    }
}

fn handle_prepare(args: &PrepareArgs) -> Result<()> {
    let config = prepare_config_from_args(args);
    let out = pipeline::run_prepare(&config)?;

    println!("{}", crate::report::format_prepare_summary(&out.dataset));
    for path in &out.written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn handle_plot_data(args: &PlotDataArgs) -> Result<()> {
    let config = plot_data_config_from_args(args);
    let frame = pipeline::run_plot_data(&config)?;

    match &args.output {
        Some(path) => {
            crate::io::write_plot_frame_csv(path, &frame)?;
            eprint!("{}", crate::report::format_plot_frame_summary(&frame));
        }
        None => {
            let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
            crate::io::write_plot_frame(&mut writer, &frame)?;
            writer
                .flush()
                .map_err(|e| AppError::Io(format!("Failed to write plot frame: {e}")))?;
        }
    }
    Ok(())
}

fn handle_plot(args: &PlotArgs) -> Result<()> {
    let config = plot_config_from_args(args)?;
    let chart = pipeline::run_plot(&config)?;

    match &args.output {
        Some(path) => write_text(path, &chart),
        None => {
            println!("{chart}");
            Ok(())
        }
    }
}

fn handle_demo(args: &DemoArgs) -> Result<()> {
    let config = demo_config_from_args(args);
    let out = pipeline::run_demo(&config)?;
    let p = out.sample.periods;

    println!("wrote {}", out.input_path.display());
    println!("wrote {}", out.evaluation_path.display());
    println!(
        "pre-period {} .. {} | post-period {} .. {} | effect {}",
        p.pre.start, p.pre.end, p.post.start, p.post.end, config.sample.effect
    );
    Ok(())
}

pub fn prepare_config_from_args(args: &PrepareArgs) -> PrepareConfig {
    PrepareConfig {
        input: args.input.clone(),
        pre: (args.pre_start.clone().into(), args.pre_end.clone().into()),
        post: (args.post_start.clone().into(), args.post_end.clone().into()),
        options: DatasetOptions {
            target: args.target.clone(),
            standardize: !args.no_standardize,
            drop_post_period_missing: !args.keep_post_missing,
        },
        index_kind: args.index_kind,
        out_dir: args.out_dir.clone(),
    }
}

pub fn plot_data_config_from_args(args: &PlotDataArgs) -> PlotDataConfig {
    PlotDataConfig {
        evaluation: args.evaluation.clone(),
        alpha: args.alpha,
        index_kind: args.index_kind,
    }
}

/// Options file first, then flag overrides.
pub fn plot_config_from_args(args: &PlotArgs) -> Result<PlotConfig> {
    let mut render = match &args.options {
        Some(path) => RenderOptions::from_json_file(path)?,
        None => RenderOptions::default(),
    };
    let overrides = RenderOverrides {
        backend: args.backend.as_deref().map(Backend::from_str).transpose()?,
        band_method: args.band_method,
        show_median: args.show_median,
        alpha: args.alpha,
    };
    overrides.apply(&mut render);

    Ok(PlotConfig {
        evaluation: args.evaluation.clone(),
        index_kind: args.index_kind,
        render,
    })
}

pub fn demo_config_from_args(args: &DemoArgs) -> DemoConfig {
    DemoConfig {
        out_dir: args.out_dir.clone(),
        sample: SampleConfig {
            n_pre: args.n_pre,
            n_post: args.n_post,
            effect: args.effect,
            noise_sd: args.noise_sd,
            seed: args.seed,
            ..SampleConfig::default()
        },
        alpha: args.alpha,
    }
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .map_err(|e| AppError::Io(format!("Failed to create {}: {e}", path.display())))?;
    writeln!(file, "{text}").map_err(|e| AppError::Io(format!("Failed to write {}: {e}", path.display())))
}

//! Dataset Preparation Tool
//!
//! Loads a daily panel CSV, runs indicators, labeling, filtering, the
//! chronological split and sequence building, then exports NumPy arrays for
//! training an external sequence model.
//!
//! # Usage
//!
//! ```bash
//! # Defaults
//! cargo run --release --bin prepare_dataset -- --input panel.csv --output dataset/
//!
//! # From TOML config
//! cargo run --release --bin prepare_dataset -- --input panel.csv --output dataset/ --config experiment.toml
//!
//! # Write the default config to edit
//! cargo run --release --bin prepare_dataset -- --generate-config experiment.toml
//! ```
//!
//! Log level defaults to `info`; override with `RUST_LOG`.

use excess_return_pipeline::config::ExperimentMetadata;
use excess_return_pipeline::export::DatasetExporter;
use excess_return_pipeline::{Pipeline, PipelineConfig, Result};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Default)]
struct Args {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    generate_config: Option<PathBuf>,
    threads: Option<usize>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = std::env::args().collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("Error: {msg}");
            print_usage(&argv[0]);
            process::exit(1);
        }
    };

    if let Err(e) = run(args) {
        log::error!("{e}");
        process::exit(1);
    }
}

fn parse_args(argv: &[String]) -> std::result::Result<Args, String> {
    let mut args = Args::default();
    let mut it = argv.iter().skip(1);
    while let Some(flag) = it.next() {
        let mut value = || it.next().cloned().ok_or_else(|| format!("{flag} requires a value"));
        match flag.as_str() {
            "--input" => args.input = Some(PathBuf::from(value()?)),
            "--output" => args.output = Some(PathBuf::from(value()?)),
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--generate-config" => args.generate_config = Some(PathBuf::from(value()?)),
            "--threads" => {
                let v = value()?;
                args.threads = Some(v.parse().map_err(|_| format!("invalid --threads value: {v}"))?);
            }
            "--help" | "-h" => {
                print_usage(&argv[0]);
                process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Dataset Preparation Tool

Usage:
    {program} --input <panel.csv> --output <dir> [--config <path.toml|json>] [--threads <n>]
    {program} --generate-config <path.toml>
    {program} --help

Panel columns: entity_id, date, open, high, low, close, high_52w, low_52w,
base_price, current_price, volume, rank, acc_volume, listed_shares
"#
    );
}

fn run(args: Args) -> Result<()> {
    if let Some(path) = args.generate_config {
        let config = PipelineConfig::default().with_metadata(ExperimentMetadata::named("excess-return"));
        config.save_toml(&path)?;
        log::info!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let (Some(input), Some(output)) = (args.input, args.output) else {
        return Err(excess_return_pipeline::PipelineError::config(
            "--input and --output are required",
        ));
    };

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(n) = args.threads {
        config = config.with_num_threads(n);
    }

    let pipeline = Pipeline::from_config(config)?;
    let dataset = pipeline.prepare_csv(&input)?;

    let stats = &dataset.stats;
    log::info!(
        "Sequences: train {} / validation {} / test {} / latest {}",
        dataset.train.len(),
        dataset.validation.len(),
        dataset.test.len(),
        dataset.latest.len()
    );
    log::info!(
        "Rows: {} observed, {} labeled ({} horizon, {} outlier, {} liquidity, {} incomplete dropped)",
        stats.observation_rows,
        stats.labeled_rows,
        stats.horizon_dropped,
        stats.outliers_discarded,
        stats.liquidity_dropped,
        stats.incomplete_dropped
    );

    DatasetExporter::new(&output).export(&dataset, pipeline.config())?;
    Ok(())
}

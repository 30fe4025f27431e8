//! Prediction Evaluation Tool
//!
//! Re-prepares the panel with the same configuration used for export, joins
//! an external model's predictions by `(entity_id, date)` and writes the full
//! evaluation report.
//!
//! Predictions CSV columns: `entity_id, date, score, probability`, where
//! `score` is in scaled target space (as trained on `*_targets.npy`) and
//! `date` is the window end date from `*_keys.csv`. Validation and test rows
//! are required; `latest` rows are optional.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin evaluate_predictions -- \
//!     --input panel.csv --predictions preds.csv --output report/ --config experiment.toml
//! ```

use excess_return_pipeline::export::ReportWriter;
use excess_return_pipeline::model::{FilePredictor, MeanBaselinePredictor};
use excess_return_pipeline::{Pipeline, PipelineConfig, PipelineError, Result};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Default)]
struct Args {
    input: Option<PathBuf>,
    predictions: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    baseline: bool,
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
            "--predictions" => args.predictions = Some(PathBuf::from(value()?)),
            "--output" => args.output = Some(PathBuf::from(value()?)),
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--baseline" => args.baseline = true,
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
Prediction Evaluation Tool

Usage:
    {program} --input <panel.csv> --predictions <preds.csv> --output <dir> [--config <path>]
    {program} --input <panel.csv> --baseline --output <dir> [--config <path>]
    {program} --help

--baseline evaluates the train-mean constant predictor instead of a file.
"#
    );
}

fn run(args: Args) -> Result<()> {
    let (Some(input), Some(output)) = (args.input, args.output) else {
        return Err(PipelineError::config("--input and --output are required"));
    };

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = Pipeline::from_config(config)?;
    let dataset = pipeline.prepare_csv(&input)?;

    let report = if args.baseline {
        let baseline = MeanBaselinePredictor::fit(&dataset.train);
        pipeline.evaluate(&dataset, &baseline)?
    } else {
        let Some(path) = args.predictions else {
            return Err(PipelineError::config("--predictions or --baseline is required"));
        };
        let predictor = FilePredictor::from_csv_path(&path)?;
        pipeline.evaluate(&dataset, &predictor)?
    };

    ReportWriter::new(&output).write(&report)?;
    Ok(())
}

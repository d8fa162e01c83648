use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use stride_analysis::{AnalysisConfig, AnalysisOutcome, ErrorRecord, analyze_file, default_output_path};

#[derive(Parser, Debug)]
#[command(name = "stride-analysis", about = "Pose overlay and stride feedback for running videos")]
struct Args {
    /// Input video
    input: PathBuf,
    /// Annotated output video (default: skeleton_<input name>)
    output: Option<PathBuf>,
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Pose landmark ONNX model
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,
    /// Frame rate to assume when the container reports none
    #[arg(long)]
    fallback_fps: Option<f64>,
    /// Write frames without the skeleton overlay
    #[arg(long)]
    no_overlay: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(outcome) => match serde_json::to_string(&outcome) {
            Ok(line) => {
                println!("{line}");
                ExitCode::SUCCESS
            }
            Err(err) => fail(&format!("failed to serialize report: {err}")),
        },
        Err(err) => fail(&format!("{err:#}")),
    }
}

fn run(args: Args) -> Result<AnalysisOutcome> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(model) = args.model {
        config.estimator.model_path = model;
    }
    if let Some(fps) = args.fallback_fps {
        config.video.fallback_fps = fps;
    }
    if args.no_overlay {
        config.overlay.enabled = false;
    }

    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input));
    eprintln!(
        "Processing video: {} -> {}",
        args.input.display(),
        output.display()
    );

    let outcome = analyze_file(&config, &args.input, Some(&output))?;
    Ok(outcome)
}

fn fail(message: &str) -> ExitCode {
    log::error!("{message}");
    let record = ErrorRecord {
        error: message.to_string(),
    };
    match serde_json::to_string(&record) {
        Ok(line) => println!("{line}"),
        Err(_) => println!("{{\"error\": \"analysis failed\"}}"),
    }
    ExitCode::FAILURE
}

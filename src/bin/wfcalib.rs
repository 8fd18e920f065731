use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use waveform_calib::calibration::{BufferPolicy, SerialNumber, SourceKind};
use waveform_calib::config::AppConfig;
use waveform_calib::fixtures::{
    CalibrationReport, EventFixture, ExpectationDiff, DEFAULT_FIXTURE_ROOT,
};

#[derive(Parser, Debug)]
#[command(
    name = "wfcalib",
    about = "Deterministic waveform calibration harness"
)]
struct Cli {
    /// Override directory containing fixture assets (defaults to ./fixtures)
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    /// Calibrator configuration JSON (defaults to <fixtures_dir>/calibrator.json)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the calibrator the configuration resolves to
    Describe,
    /// Calibrate a fixture event and optionally compare against its expectations
    Apply {
        #[arg(long)]
        fixture: String,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Allocate a fresh output array instead of the reused buffer
        #[arg(long)]
        fresh: bool,
    },
}

#[derive(Serialize)]
struct Description {
    source_kind: SourceKind,
    pedestal_path: PathBuf,
    n_pixels: usize,
    n_samples: usize,
    buffer_policy: BufferPolicy,
    serial_numbers: Option<Vec<SerialNumber>>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let fixtures_dir = cli
        .fixtures_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FIXTURE_ROOT));
    let config_path = cli
        .config
        .unwrap_or_else(|| fixtures_dir.join("calibrator.json"));
    let config = AppConfig::try_load_from_file(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    waveform_calib::init_logging(&config.logging.level);

    match cli.command {
        Commands::Describe => run_describe(&config),
        Commands::Apply {
            fixture,
            output,
            fresh,
        } => run_apply(&config, &fixtures_dir, &fixture, output, fresh),
    }
}

fn run_describe(config: &AppConfig) -> Result<ExitCode> {
    let calibrator = config.calibrator.build(&config.reference)?;
    let description = Description {
        source_kind: calibrator.source_kind(),
        pedestal_path: config.calibrator.pedestal_path.clone(),
        n_pixels: calibrator.n_pixels(),
        n_samples: calibrator.n_samples(),
        buffer_policy: calibrator.buffer_policy(),
        serial_numbers: config.calibrator.serial_numbers.clone(),
    };
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(ExitCode::from(0))
}

fn run_apply(
    config: &AppConfig,
    fixtures_dir: &Path,
    fixture: &str,
    output_path: Option<PathBuf>,
    fresh: bool,
) -> Result<ExitCode> {
    let mut calibrator = config.calibrator.build(&config.reference)?;
    let event = EventFixture::load(fixtures_dir.join(format!("{fixture}.json")))?;
    let (waveforms, first_cell_ids) = event.to_arrays()?;
    let source_kind = calibrator.source_kind();

    let owned;
    let calibrated = if fresh {
        owned = calibrator.apply_owned(waveforms.view(), first_cell_ids.view())?;
        owned.view()
    } else {
        calibrator.apply(waveforms.view(), first_cell_ids.view())?
    };

    let report = CalibrationReport::new(fixture, source_kind, calibrated);
    emit_report(&report, output_path)?;

    match event.verify(calibrated) {
        Ok(()) => Ok(ExitCode::from(0)),
        Err(diff) => {
            emit_diff(&diff)?;
            Ok(ExitCode::from(2))
        }
    }
}

fn emit_report(report: &CalibrationReport, output_path: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(path) = output_path {
        fs::write(&path, &json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{}", json);
    }
    Ok(())
}

fn emit_diff(diff: &ExpectationDiff) -> Result<()> {
    eprintln!("{}", serde_json::to_string_pretty(diff)?);
    Ok(())
}

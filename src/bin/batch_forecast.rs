//! Forecast many work-order exports in parallel
//!
//! Each file is an independent pipeline run; nothing is shared between them.
//! Writes one projection table per file and prints a summary, or JSON with --json.

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use workorder_forecast::pipeline::{metrics::WEIGHT, run_file, PipelineConfig, PipelineOutput};
use workorder_forecast::scenario::Scenario;

#[derive(Parser)]
#[command(name = "batch-forecast")]
#[command(about = "Run the work-order forecast over several CSV exports", long_about = None)]
struct Cli {
    /// CSV exports to forecast
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// JSON pipeline configuration shared by every file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory for `<file stem>_projection.csv` tables
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Print a JSON summary instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct FileSummary {
    file: String,
    status: String,
    months_observed: usize,
    last_historical: Option<f64>,
    final_central: Option<f64>,
    final_optimistic: Option<f64>,
    final_pessimistic: Option<f64>,
    failed_series: usize,
    table: Option<String>,
}

impl FileSummary {
    fn failed(file: &Path, error: impl std::fmt::Display) -> Self {
        Self {
            file: file.display().to_string(),
            status: format!("error: {}", error),
            months_observed: 0,
            last_historical: None,
            final_central: None,
            final_optimistic: None,
            final_pessimistic: None,
            failed_series: 0,
            table: None,
        }
    }

    fn from_output(file: &Path, output: &PipelineOutput, table: Option<String>) -> Self {
        let cumulative = output.cumulative.get(WEIGHT);
        Self {
            file: file.display().to_string(),
            status: "ok".to_string(),
            months_observed: output.diagnostics.months_observed,
            last_historical: cumulative.map(|c| c.last_historical),
            final_central: cumulative.map(|c| c.final_value(Scenario::Realistic)),
            final_optimistic: cumulative.map(|c| c.final_value(Scenario::Optimistic)),
            final_pessimistic: cumulative.map(|c| c.final_value(Scenario::Pessimistic)),
            failed_series: output.failures.len(),
            table,
        }
    }
}

#[derive(Serialize)]
struct BatchResponse {
    files: Vec<FileSummary>,
    execution_time_ms: u64,
}

fn forecast_file(path: &Path, config: &PipelineConfig, out_dir: &Path) -> FileSummary {
    let output = match run_file(path, config) {
        Ok(output) => output,
        Err(e) => {
            log::warn!("{}: {}", path.display(), e);
            return FileSummary::failed(path, e);
        }
    };

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let table_path = out_dir.join(format!("{}_projection.csv", stem));

    // A failed export is reported but the forecast summary is kept
    let table = match output.projection_table().write_csv_path(&table_path) {
        Ok(()) => Some(table_path.display().to_string()),
        Err(e) => {
            log::error!("failed to write {}: {}", table_path.display(), e);
            None
        }
    };
    FileSummary::from_output(path, &output, table)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("failed to create {}", cli.out_dir.display()))?;

    let summaries: Vec<FileSummary> = cli
        .files
        .par_iter()
        .map(|path| forecast_file(path, &config, &cli.out_dir))
        .collect();

    if cli.json {
        let response = BatchResponse {
            files: summaries,
            execution_time_ms: start.elapsed().as_millis() as u64,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!(
        "{:<32} {:>7} {:>14} {:>14} {:>14} {:>14}",
        "File", "Months", "To date", "Pessimistic", "Realistic", "Optimistic"
    );
    println!("{}", "-".repeat(100));
    let fmt = |v: Option<f64>| v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string());
    for s in &summaries {
        if s.status != "ok" {
            println!("{:<32} {}", s.file, s.status);
            continue;
        }
        println!(
            "{:<32} {:>7} {:>14} {:>14} {:>14} {:>14}",
            s.file,
            s.months_observed,
            fmt(s.last_historical),
            fmt(s.final_pessimistic),
            fmt(s.final_central),
            fmt(s.final_optimistic)
        );
    }
    println!("\nProcessed {} file(s) in {:?}", summaries.len(), start.elapsed());
    Ok(())
}

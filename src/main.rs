//! Work-order forecast CLI
//!
//! Loads a work-order CSV export, forecasts the configured monthly metrics to
//! the target month and writes the projection table and chart payload.

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use workorder_forecast::pipeline::{
    load_dataset, run_pipeline, MetricSet, PipelineConfig, PipelineOutput,
};
use workorder_forecast::records::Field;
use workorder_forecast::scenario::Scenario;
use workorder_forecast::series::{aggregate_monthly, yearly_pivot, AggregateRequest, Reduction};

#[derive(Parser)]
#[command(name = "workorder-forecast")]
#[command(about = "Monthly tonnage forecasts with realistic, optimistic and pessimistic scenarios", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Work-order CSV export
    #[arg(long)]
    input: PathBuf,
    /// JSON pipeline configuration; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Drop records completed before this date (YYYY-MM-DD)
    #[arg(long)]
    cutoff: Option<NaiveDate>,
    /// Drop records without a service-order reference
    #[arg(long)]
    require_order_ref: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricPreset {
    Weight,
    WeightAndCount,
    All,
}

impl From<MetricPreset> for MetricSet {
    fn from(preset: MetricPreset) -> Self {
        match preset {
            MetricPreset::Weight => MetricSet::WeightOnly,
            MetricPreset::WeightAndCount => MetricSet::WeightAndCount,
            MetricPreset::All => MetricSet::WeightCountAndRatios,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast to the target month and export the results
    Project {
        #[command(flatten)]
        source: SourceArgs,
        /// Last month to forecast (YYYY-MM or YYYY-MM-DD)
        #[arg(long, value_parser = parse_month)]
        target: Option<NaiveDate>,
        /// Trailing window in months
        #[arg(long, conflicts_with = "all_history")]
        window: Option<u32>,
        /// Use the whole history instead of a trailing window
        #[arg(long)]
        all_history: bool,
        /// Probability mass outside the interval (0.20 gives an 80% interval)
        #[arg(long)]
        tail_mass: Option<f64>,
        #[arg(long, value_enum)]
        metrics: Option<MetricPreset>,
        /// Projection table output
        #[arg(long, default_value = "projection.csv")]
        csv_out: PathBuf,
        /// Chart payload output
        #[arg(long)]
        json_out: Option<PathBuf>,
    },
    /// Show cleaning counts and the monthly tonnage series
    Inspect {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show tonnage by calendar month and year
    Pivot {
        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Accept `YYYY-MM` as well as a full date
fn parse_month(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"))
        .map_err(|e| format!("expected YYYY-MM or YYYY-MM-DD: {}", e))
}

fn base_config(source: &SourceArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &source.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if source.cutoff.is_some() {
        config.minimum_history_cutoff = source.cutoff;
    }
    if source.require_order_ref {
        config.require_order_ref = true;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Project {
            source,
            target,
            window,
            all_history,
            tail_mass,
            metrics,
            csv_out,
            json_out,
        } => {
            let mut config = base_config(&source)?;
            if let Some(target) = target {
                config.target_end_month = target;
            }
            if all_history {
                config.trailing_window_months = None;
            } else if window.is_some() {
                config.trailing_window_months = window;
            }
            if let Some(tail) = tail_mass {
                config.confidence_tail_mass = tail;
            }
            if let Some(preset) = metrics {
                config.metrics = preset.into();
            }

            let dataset = load_dataset(&source.input, &config)
                .with_context(|| format!("failed to load {}", source.input.display()))?;
            let output = run_pipeline(&dataset, &config)?;

            print_summary(&output, &config);
            export(&output, &csv_out, json_out.as_deref())?;
        }
        Commands::Inspect { source } => {
            let config = base_config(&source)?;
            let dataset = load_dataset(&source.input, &config)
                .with_context(|| format!("failed to load {}", source.input.display()))?;

            let stats = &dataset.stats;
            println!("Rows read:              {}", stats.rows_in);
            println!("Rows kept:              {}", stats.rows_kept);
            println!("Dropped (missing):      {}", stats.dropped_missing);
            println!("Dropped (future):       {}", stats.dropped_future);
            println!("Dropped (before cutoff): {}", stats.dropped_before_cutoff);
            println!();

            let requests = [
                AggregateRequest::new(Field::Weight, Reduction::Sum),
                AggregateRequest::new(Field::OrderRef, Reduction::Count),
            ];
            let aggregate = aggregate_monthly(&dataset, &requests);
            println!("{:>10} {:>14} {:>8}", "Month", "Tons", "Orders");
            println!("{}", "-".repeat(34));
            for month in &aggregate.index {
                println!(
                    "{:>10} {:>14.2} {:>8}",
                    month.format("%Y-%m"),
                    aggregate.series[0].get(*month).unwrap_or(0.0),
                    aggregate.series[1].get(*month).unwrap_or(0.0)
                );
            }
        }
        Commands::Pivot { source } => {
            let config = base_config(&source)?;
            let dataset = load_dataset(&source.input, &config)
                .with_context(|| format!("failed to load {}", source.input.display()))?;
            let pivot = yearly_pivot(&dataset, Field::Weight);

            print!("{:>10}", "Month");
            for year in &pivot.years {
                print!(" {:>12}", year);
            }
            println!();
            println!("{}", "-".repeat(10 + 13 * pivot.years.len()));
            for row in &pivot.rows {
                print!("{:>10}", row.month_name);
                for value in &row.values {
                    print!(" {:>12.2}", value);
                }
                println!();
            }
            print!("{:>10}", "Total");
            for total in pivot.year_totals() {
                print!(" {:>12.2}", total);
            }
            println!();
        }
    }

    Ok(())
}

fn print_summary(output: &PipelineOutput, config: &PipelineConfig) {
    let d = &output.diagnostics;
    println!("Work-order forecast");
    println!("===================\n");
    println!(
        "Records: {} kept of {} ({} missing, {} future, {} before cutoff)",
        d.cleaning.rows_kept,
        d.cleaning.rows_in,
        d.cleaning.dropped_missing,
        d.cleaning.dropped_future,
        d.cleaning.dropped_before_cutoff
    );
    if let (Some(first), Some(last)) = (d.first_month, d.last_month) {
        println!(
            "History: {} months, {} to {}",
            d.months_observed,
            first.format("%Y-%m"),
            last.format("%Y-%m")
        );
    }
    println!(
        "Target: {}  Model: ARIMA{}  Interval: {:.0}%",
        config.target_month().format("%Y-%m"),
        config.model_order,
        (1.0 - config.confidence_tail_mass) * 100.0
    );

    for (metric, forecast) in &output.forecasts {
        println!("\n{} (mean {:.2})", metric, output.means.get(metric).copied().unwrap_or(0.0));
        println!(
            "{:>8} {:>12} {:>12} {:>12}",
            "Month",
            Scenario::Pessimistic.label(),
            Scenario::Realistic.label(),
            Scenario::Optimistic.label()
        );
        println!("{}", "-".repeat(47));
        for (i, month) in forecast.future_months.iter().enumerate() {
            println!(
                "{:>8} {:>12.2} {:>12.2} {:>12.2}",
                month.format("%Y-%m"),
                forecast.pessimistic()[i],
                forecast.central()[i],
                forecast.optimistic()[i]
            );
        }
        if let Some(cum) = output.cumulative.get(metric) {
            println!(
                "Cumulative: {:.2} to date, {:.2} / {:.2} / {:.2} at target",
                cum.last_historical,
                cum.final_value(Scenario::Pessimistic),
                cum.final_value(Scenario::Realistic),
                cum.final_value(Scenario::Optimistic)
            );
        }
    }

    for (metric, excluded) in &d.excluded_months {
        if *excluded > 0 {
            println!("\n{}: {} month(s) excluded (non-finite)", metric, excluded);
        }
    }
    for failure in &output.failures {
        println!("\n{}: not forecast: {}", failure.metric, failure.error);
    }
}

/// Write the exports, attempting each one even if an earlier one failed
fn export(output: &PipelineOutput, csv_out: &Path, json_out: Option<&Path>) -> anyhow::Result<()> {
    let mut failed = Vec::new();

    match output.projection_table().write_csv_path(csv_out) {
        Ok(()) => println!("\nProjection table written to: {}", csv_out.display()),
        Err(e) => {
            eprintln!("Failed to write {}: {}", csv_out.display(), e);
            failed.push(csv_out.display().to_string());
        }
    }

    if let Some(path) = json_out {
        let written = output
            .to_json()
            .map_err(anyhow::Error::from)
            .and_then(|json| std::fs::write(path, json).map_err(anyhow::Error::from));
        match written {
            Ok(()) => println!("Chart payload written to: {}", path.display()),
            Err(e) => {
                eprintln!("Failed to write {}: {}", path.display(), e);
                failed.push(path.display().to_string());
            }
        }
    }

    if !failed.is_empty() {
        bail!("export failed for {}", failed.join(", "));
    }
    Ok(())
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod analysis;
mod config;
mod ingest;
mod models;
mod report;
mod risk;
mod rules;
mod simulate;
mod summary;

use config::Thresholds;
use models::{AlertTally, AnalysisResult, Severity};

#[derive(Parser)]
#[command(name = "outbreak-monitor")]
#[command(about = "Outbreak early warning from daily clinic visit counts", version, long_about = None)]
struct Cli {
    /// TOML file overriding detection and scoring thresholds
    #[arg(long, global = true, env = config::CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a clinic CSV and print alerts and risk
    Analyze {
        #[arg(long)]
        csv: PathBuf,
        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a markdown outbreak report for a clinic CSV
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "outbreak_report.md")]
        out: PathBuf,
    },
    /// Write a sample CSV showing the expected columns
    Template {
        #[arg(long, default_value = "clinic_data_template.csv")]
        out: PathBuf,
    },
    /// Run a synthetic clinic feed, re-analysing after every simulated day
    Simulate {
        #[arg(long, default_value_t = 30)]
        days: u32,
        #[arg(long, default_value_t = 12)]
        clinics: usize,
        /// Percent chance that a candidate outbreak takes hold
        #[arg(long, default_value_t = 30)]
        outbreak_probability: u32,
        #[arg(long)]
        seed: Option<u64>,
        /// Try to start an outbreak before generating this day (1-based)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        outbreak_on_day: Option<u32>,
        #[arg(long, default_value = "2024-01-01")]
        start_date: NaiveDate,
        /// Pause between simulated days
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
        /// Also write the generated records as CSV
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let thresholds = load_thresholds(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { csv, json } => {
            let ingested = ingest::read_path(&csv)
                .with_context(|| format!("failed to ingest {}", csv.display()))?;
            let result = analysis::analyze(&ingested.records, &thresholds);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_analysis(&result);
            }
        }
        Commands::Report { csv, out } => {
            let ingested = ingest::read_path(&csv)
                .with_context(|| format!("failed to ingest {}", csv.display()))?;
            let result = analysis::analyze(&ingested.records, &thresholds);
            let source = csv.display().to_string();
            let report = report::build_report(&source, &result);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Template { out } => {
            std::fs::write(&out, ingest::TEMPLATE_CSV)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Template written to {}.", out.display());
        }
        Commands::Simulate {
            days,
            clinics,
            outbreak_probability,
            seed,
            outbreak_on_day,
            start_date,
            interval_ms,
            out,
        } => {
            let config = simulate::SimulationConfig::new(clinics, outbreak_probability, start_date);
            let mut simulator = simulate::FeedSimulator::new(config, seed)?;
            tracing::info!(clinics = simulator.clinics().len(), "clinic network placed");
            let mut cumulative = AlertTally::default();
            let mut latest = None;

            for _ in 0..days {
                let upcoming = simulator.day() + 1;
                if outbreak_on_day == Some(upcoming) {
                    let active = simulator.trigger_outbreak();
                    tracing::info!(day = upcoming, active, "manual outbreak trigger");
                    println!(
                        "Manual outbreak trigger on day {upcoming}: {}",
                        if active { "outbreak active" } else { "no outbreak" }
                    );
                }

                let tick = simulator.tick(&thresholds);
                cumulative.absorb(tick.new_alerts);
                tracing::info!(
                    day = tick.day,
                    date = %tick.date,
                    records = tick.new_records,
                    epicenter = tick.outbreak_epicenter.as_deref().unwrap_or("none"),
                    high = tick.new_alerts.high,
                    medium = tick.new_alerts.medium,
                    level = %tick.result.risk.level,
                    score = tick.result.risk.score,
                    "simulated day"
                );
                latest = Some(tick.result);

                if interval_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }
            }

            if let Some(path) = out {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                ingest::write_records(file, simulator.records())?;
                println!(
                    "Wrote {} simulated records to {}.",
                    simulator.records().len(),
                    path.display()
                );
            }

            println!(
                "Simulated {} days: {} high and {} medium alerts raised.",
                simulator.day(),
                cumulative.high,
                cumulative.medium
            );
            if let Some(result) = latest {
                print_analysis(&result);
            }
        }
    }

    Ok(())
}

fn load_thresholds(path: Option<&Path>) -> anyhow::Result<Thresholds> {
    match path {
        Some(path) => Thresholds::load(path)
            .with_context(|| format!("invalid threshold config {}", path.display())),
        None => Ok(Thresholds::default()),
    }
}

fn print_analysis(result: &AnalysisResult) {
    let summary = &result.summary;
    let risk = &result.risk;

    if summary.total_records == 0 {
        println!("No records to analyse; risk defaults to {}.", risk.level);
        return;
    }

    if let (Some(start), Some(end)) = (summary.date_start, summary.date_end) {
        println!(
            "{} records from {} clinics, {start} to {end} ({} patients).",
            summary.total_records,
            summary.sites.len(),
            summary.total_patients
        );
    }

    println!(
        "Risk {} ({}/100), trend {}, {:.1} avg daily cases, {} severe in 7 days.",
        risk.level, risk.score, risk.trend, risk.avg_daily_cases, risk.severe_cases_7d
    );
    println!("Recommendation: {}", risk.recommendation);

    let tally = AlertTally::from_alerts(&result.alerts);
    println!(
        "Alerts: {} ({} high, {} medium)",
        tally.total(),
        tally.high,
        tally.medium
    );

    for (severity, label) in [(Severity::High, "HIGH"), (Severity::Medium, "MEDIUM")] {
        let matching = report::alerts_with_severity(&result.alerts, severity);
        for alert in matching.iter().take(report::ALERTS_PER_SEVERITY) {
            println!("- [{label}] {} {}: {}", alert.date, alert.kind, alert.description);
        }
        if matching.len() > report::ALERTS_PER_SEVERITY {
            println!(
                "  ... and {} more {label} alerts",
                matching.len() - report::ALERTS_PER_SEVERITY
            );
        }
    }
}

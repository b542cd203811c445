//! Data validator
//!
//! Runs an expectation suite against a CSV file and exits with an error when
//! any expectation fails.

use anyhow::Result;
use clap::Parser;
use credit_scoring::{
    config::AppConfig,
    data::{ExpectationSuite, Table},
    telemetry::init_logging,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "validate-data")]
#[command(about = "Validate a credit dataset against an expectation suite", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    /// CSV to validate (defaults to the processed training split)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Expectation suite JSON (defaults to the built-in suite)
    #[arg(short, long)]
    suite: Option<PathBuf>,

    /// Use the built-in suite for the raw, unprocessed file
    #[arg(long)]
    raw: bool,

    /// Write the validation report here
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Write the selected suite as JSON and exit
    #[arg(long)]
    export_suite: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from_path(&cli.config)?;
    init_logging(&config.logging)?;

    let suite = match &cli.suite {
        Some(path) => ExpectationSuite::load(path)?,
        None if cli.raw => ExpectationSuite::raw_credit_default(&config.data),
        None => ExpectationSuite::credit_default(&config.features),
    };

    if let Some(path) = &cli.export_suite {
        suite.save(path)?;
        info!(path = %path.display(), suite = %suite.name, "Suite exported");
        return Ok(());
    }

    let input = match cli.input {
        Some(path) => path,
        None if cli.raw => PathBuf::from(&config.data.raw_path),
        None => config.data.train_path(),
    };
    let table = Table::read_csv(&input)?;
    info!(input = %input.display(), rows = table.n_rows(), suite = %suite.name, "Validating");

    let report = suite.validate(&table);
    if let Some(path) = &cli.report {
        report.save(path)?;
    }
    let report = report.into_result()?;
    info!(run_id = %report.run_id, "Validation succeeded");
    Ok(())
}

//! Drift monitor
//!
//! Sends a seeded sample of the test split to the running prediction service
//! and compares the returned probabilities to the training reference.

use anyhow::Result;
use clap::Parser;
use credit_scoring::{config::AppConfig, drift::monitor_drift, telemetry::init_logging};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "monitor-drift")]
#[command(about = "Check served predictions for distribution drift", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Prediction service base URL
    #[arg(long)]
    url: Option<String>,

    /// Number of test rows to score
    #[arg(long)]
    sample_size: Option<usize>,

    /// Write the drift report as JSON
    #[arg(long)]
    report: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from_path(&cli.config)?;
    init_logging(&config.logging)?;

    if let Some(url) = cli.url {
        config.drift.service_url = url;
    }
    if let Some(size) = cli.sample_size {
        config.drift.sample_size = size;
    }
    if cli.report.is_some() {
        config.drift.report_path = cli.report;
    }

    let report = monitor_drift(&config).await?;
    println!(
        "PSI: {:.4}  KS: {:.4}  predictions: {}/{}  -> {}",
        report.psi,
        report.ks_statistic,
        report.predictions,
        report.requested,
        report.status.describe()
    );
    Ok(())
}

//! Sample data generator
//!
//! Writes a synthetic raw file with the UCI credit card default layout, for
//! trying the pipeline without the real dataset.

use anyhow::Result;
use clap::Parser;
use credit_scoring::{config::AppConfig, synthetic::ApplicantGenerator, telemetry::init_logging};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "generate-sample")]
#[command(about = "Generate a synthetic raw credit default dataset", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Number of applicants
    #[arg(short, long, default_value = "5000")]
    rows: usize,

    /// Share of applicants with a risky profile
    #[arg(long, default_value = "0.22")]
    risky_rate: f64,

    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Output CSV (defaults to the configured raw path)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from_path(&cli.config)?;
    init_logging(&config.logging)?;

    if !(0.0..=1.0).contains(&cli.risky_rate) {
        anyhow::bail!("--risky-rate must be within [0, 1]");
    }

    let output = cli.output.unwrap_or_else(|| PathBuf::from(&config.data.raw_path));
    let table = ApplicantGenerator::new(cli.seed).raw_table(
        cli.rows,
        cli.risky_rate,
        &config.data.id_column,
        &config.data.raw_target_column,
    );
    table.write_csv(&output)?;

    info!(
        rows = cli.rows,
        risky_rate = cli.risky_rate,
        output = %output.display(),
        "Sample dataset written"
    );
    Ok(())
}

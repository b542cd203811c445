//! Dataset builder
//!
//! Reads the raw UCI credit card file, drops duplicates and writes stratified
//! `train.csv` / `test.csv` splits to the processed directory.

use anyhow::Result;
use clap::Parser;
use credit_scoring::{
    config::AppConfig,
    data::{build_dataset, ExpectationSuite, Table},
    telemetry::init_logging,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "make-dataset")]
#[command(about = "Build train/test splits from the raw credit dataset", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Raw CSV to read instead of the configured one
    #[arg(long)]
    raw: Option<String>,

    /// Output directory instead of the configured one
    #[arg(long)]
    output_dir: Option<String>,

    /// Validate the raw file before splitting
    #[arg(long)]
    validate: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from_path(&cli.config)?;
    init_logging(&config.logging)?;

    if let Some(raw) = cli.raw {
        config.data.raw_path = raw;
    }
    if let Some(dir) = cli.output_dir {
        config.data.processed_dir = dir;
    }

    if cli.validate {
        let raw = Table::read_csv(&config.data.raw_path)?;
        ExpectationSuite::raw_credit_default(&config.data)
            .validate(&raw)
            .into_result()?;
    }

    let (train, test) = build_dataset(&config)?;
    info!(train = %train.display(), test = %test.display(), "Dataset ready");
    Ok(())
}

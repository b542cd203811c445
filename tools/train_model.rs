//! Model trainer
//!
//! Grid-searches the configured classifier, evaluates it on the test split
//! and writes the model artifact and reference distribution.

use anyhow::Result;
use clap::Parser;
use credit_scoring::{config::AppConfig, telemetry::init_logging, training::train_model};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "train-model")]
#[command(about = "Train and track the credit default classifier", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Classifier to train instead of the configured one
    #[arg(long)]
    classifier: Option<String>,

    /// Cross-validation folds instead of the configured number
    #[arg(long)]
    cv_folds: Option<usize>,

    /// Write the training summary as JSON
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from_path(&cli.config)?;
    init_logging(&config.logging)?;

    if let Some(classifier) = cli.classifier {
        config.model.classifier = classifier;
    }
    if let Some(folds) = cli.cv_folds {
        config.model.cv_folds = folds;
    }

    let report = train_model(&config)?;
    info!(
        run_id = %report.run_id,
        classifier = %report.classifier,
        best_params = ?report.best_params,
        best_cv_score = report.best_cv_score,
        test_roc_auc = report.test.roc_auc,
        "Model trained"
    );
    println!("{}", report.test.confusion_matrix);

    if let Some(path) = cli.summary {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        info!(path = %path.display(), "Training summary written");
    }
    Ok(())
}

//! Configuration management for the credit scoring pipeline

use crate::models::params::{ParamGrid, ParamValue};
use crate::types::prediction::RiskLevelThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub features: FeaturesConfig,
    pub model: ModelConfig,
    pub tracking: TrackingConfig,
    pub server: ServerConfig,
    pub drift: DriftConfig,
    pub logging: LoggingConfig,
}

/// Raw data location and split settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Raw CSV as downloaded
    pub raw_path: String,
    /// Directory receiving train.csv / test.csv
    pub processed_dir: String,
    /// Identifier column dropped on load
    pub id_column: String,
    /// Target column name in the raw file
    pub raw_target_column: String,
    /// Fraction of rows held out for testing
    pub test_size: f64,
    /// Seed for the train/test split
    pub random_state: u64,
}

impl DataConfig {
    pub fn train_path(&self) -> PathBuf {
        Path::new(&self.processed_dir).join("train.csv")
    }

    pub fn test_path(&self) -> PathBuf {
        Path::new(&self.processed_dir).join("test.csv")
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_path: "data/raw/UCI_Credit_Card.csv".to_string(),
            processed_dir: "data/processed".to_string(),
            id_column: "ID".to_string(),
            raw_target_column: "default.payment.next.month".to_string(),
            test_size: 0.2,
            random_state: 42,
        }
    }
}

/// Column roles used by the preprocessor
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Binary target column after renaming
    pub target: String,
    /// Columns imputed with the median and standard-scaled
    pub numeric_features: Vec<String>,
    /// Columns imputed with 0 and one-hot encoded
    pub categorical_features: Vec<String>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        let numeric = [
            "LIMIT_BAL",
            "AGE",
            "BILL_AMT1",
            "BILL_AMT2",
            "BILL_AMT3",
            "BILL_AMT4",
            "BILL_AMT5",
            "BILL_AMT6",
            "PAY_AMT1",
            "PAY_AMT2",
            "PAY_AMT3",
            "PAY_AMT4",
            "PAY_AMT5",
            "PAY_AMT6",
            "PAY_MEAN",
            "PAY_STD",
            "LIMIT_BAL_LOG",
        ];
        let categorical = [
            "SEX",
            "EDUCATION",
            "MARRIAGE",
            "PAY_0",
            "PAY_2",
            "PAY_3",
            "PAY_4",
            "PAY_5",
            "PAY_6",
            "AGE_BINNED",
        ];

        Self {
            target: "default".to_string(),
            numeric_features: numeric.iter().map(|s| s.to_string()).collect(),
            categorical_features: categorical.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Classifier selection and search space
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Classifier kind: "logistic_regression" or "gradient_boosting"
    pub classifier: String,
    /// Hyperparameter grid per classifier kind
    pub hyperparameters: HashMap<String, ParamGrid>,
    /// Number of stratified cross-validation folds
    pub cv_folds: usize,
    /// Where the fitted pipeline is written and served from
    pub model_path: String,
    /// Training-time probability distribution used as the drift baseline
    pub reference_path: String,
}

impl ModelConfig {
    /// Grid configured for the selected classifier
    pub fn grid(&self) -> Option<&ParamGrid> {
        self.hyperparameters.get(&self.classifier).or_else(|| {
            self.hyperparameters
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(&self.classifier))
                .map(|(_, v)| v)
        })
    }
}

fn default_hyperparameters() -> HashMap<String, ParamGrid> {
    let mut logistic = BTreeMap::new();
    logistic.insert(
        "classifier__C".to_string(),
        vec![
            ParamValue::Number(0.1),
            ParamValue::Number(1.0),
            ParamValue::Number(10.0),
        ],
    );

    let mut boosting = BTreeMap::new();
    boosting.insert(
        "classifier__n_estimators".to_string(),
        vec![ParamValue::Number(50.0), ParamValue::Number(100.0)],
    );
    boosting.insert(
        "classifier__max_depth".to_string(),
        vec![ParamValue::Number(2.0), ParamValue::Number(3.0)],
    );

    let mut grids = HashMap::new();
    grids.insert("logistic_regression".to_string(), logistic);
    grids.insert("gradient_boosting".to_string(), boosting);
    grids
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            classifier: "logistic_regression".to_string(),
            hyperparameters: default_hyperparameters(),
            cv_folds: 5,
            model_path: "models/best_model.json".to_string(),
            reference_path: "models/reference_probabilities.json".to_string(),
        }
    }
}

/// Experiment tracker store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub tracking_dir: String,
    pub experiment_name: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracking_dir: "mlruns".to_string(),
            experiment_name: "credit-default".to_string(),
        }
    }
}

/// Prediction service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Probabilities strictly above this are labelled "default"
    pub threshold: f64,
    /// Probability bands reported alongside the label
    pub risk_levels: RiskLevelThresholds,
    /// Period of the metrics summary log, 0 disables it
    pub metrics_interval_secs: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            threshold: 0.5,
            risk_levels: RiskLevelThresholds::default(),
            metrics_interval_secs: 60,
        }
    }
}

/// Drift monitor settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Base URL of the prediction service
    pub service_url: String,
    /// Rows sampled from the test split
    pub sample_size: usize,
    pub random_state: u64,
    /// PSI histogram buckets over [0, 1]
    pub buckets: usize,
    /// PSI above this is reported as moderate drift
    pub moderate_threshold: f64,
    /// PSI above this is reported as significant drift
    pub significant_threshold: f64,
    pub request_timeout_ms: u64,
    /// Optional JSON report destination
    pub report_path: Option<String>,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000".to_string(),
            sample_size: 1000,
            random_state: 42,
            buckets: 10,
            moderate_threshold: 0.1,
            significant_threshold: 0.25,
            request_timeout_ms: 5000,
            report_path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty, full)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, if present, plus environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path plus `CREDIT__*` overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("CREDIT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.data.id_column, "ID");
        assert_eq!(config.features.target, "default");
        assert_eq!(config.server.threshold, 0.5);
        assert_eq!(config.model.cv_folds, 5);
        assert_eq!(config.drift.buckets, 10);
        assert!(config.model.grid().is_some());
    }

    #[test]
    fn test_processed_paths() {
        let data = DataConfig::default();
        assert_eq!(data.train_path(), PathBuf::from("data/processed/train.csv"));
        assert_eq!(data.test_path(), PathBuf::from("data/processed/test.csv"));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9100\nthreshold = 0.35\n\n[model]\nclassifier = \"gradient_boosting\""
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.threshold, 0.35);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.classifier, "gradient_boosting");
        assert_eq!(config.data.random_state, 42);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.tracking.experiment_name, "credit-default");
    }
}

//! Credit Default Scoring Pipeline Library
//!
//! Builds train/test splits from the UCI credit card default dataset, trains
//! and tracks a default classifier, serves it over HTTP and watches the served
//! probabilities for drift.

pub mod config;
pub mod data;
pub mod drift;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod preprocess;
pub mod server;
pub mod synthetic;
pub mod telemetry;
pub mod tracking;
pub mod training;
pub mod types;

pub use config::AppConfig;
pub use data::{build_dataset, DataError, Table};
pub use drift::{calculate_psi, monitor_drift, DriftReport, DriftStatus};
pub use feature_extractor::FeatureEngineer;
pub use models::{ModelArtifact, ModelError, ModelLoader, ScoringPipeline};
pub use preprocess::Preprocessor;
pub use server::{build_router, AppState};
pub use tracking::{ExperimentTracker, RunStatus};
pub use training::{train_model, TrainingReport};
pub use types::{CreditApplication, PredictionResponse};

//! Type definitions for the credit scoring pipeline

pub mod application;
pub mod prediction;

pub use application::{CreditApplication, PREDICTOR_COLUMNS};
pub use prediction::{DefaultClass, PredictionResponse, RiskLevel, RiskLevelThresholds};

//! Model training and inference components

pub mod classifier;
pub mod evaluation;
pub mod gradient_boosting;
pub mod loader;
pub mod logistic;
pub mod params;
pub mod pipeline;
pub mod search;

pub use classifier::{Classifier, ClassifierKind};
pub use evaluation::{roc_auc, ClassificationReport, ConfusionMatrix};
pub use gradient_boosting::GradientBoostingClassifier;
pub use loader::ModelLoader;
pub use logistic::LogisticRegression;
pub use params::{ParamGrid, ParamSet, ParamValue};
pub use pipeline::{ModelArtifact, ScoringPipeline};
pub use search::{GridSearch, SearchResult};

use thiserror::Error;

/// Errors raised while fitting or applying a model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model has not been fitted")]
    NotFitted,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("invalid value {value} for parameter {name}")]
    InvalidParameter { name: String, value: String },

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("unknown classifier: {0}")]
    UnknownClassifier(String),

    #[error("cross-validation needs at least {folds} rows, got {rows}")]
    NotEnoughSamples { folds: usize, rows: usize },

    #[error("labels must be 0 or 1, found {0}")]
    InvalidLabel(f64),

    #[error(transparent)]
    Data(#[from] crate::data::DataError),
}

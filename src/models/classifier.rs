//! Classifier selection by name

use super::gradient_boosting::GradientBoostingClassifier;
use super::logistic::LogisticRegression;
use super::params::ParamSet;
use super::ModelError;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported classifier families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    LogisticRegression,
    GradientBoosting,
}

impl ClassifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierKind::LogisticRegression => "logistic_regression",
            ClassifierKind::GradientBoosting => "gradient_boosting",
        }
    }

    /// Unfitted classifier of this kind configured from `params`.
    pub fn build(&self, params: &ParamSet) -> Result<Classifier, ModelError> {
        Ok(match self {
            ClassifierKind::LogisticRegression => {
                Classifier::LogisticRegression(LogisticRegression::from_params(params)?)
            }
            ClassifierKind::GradientBoosting => {
                Classifier::GradientBoosting(GradientBoostingClassifier::from_params(params)?)
            }
        })
    }
}

impl FromStr for ClassifierKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logistic_regression" => Ok(ClassifierKind::LogisticRegression),
            "gradient_boosting" => Ok(ClassifierKind::GradientBoosting),
            other => Err(ModelError::UnknownClassifier(other.to_string())),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classifier of any supported kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classifier {
    LogisticRegression(LogisticRegression),
    GradientBoosting(GradientBoostingClassifier),
}

impl Classifier {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            Classifier::LogisticRegression(_) => ClassifierKind::LogisticRegression,
            Classifier::GradientBoosting(_) => ClassifierKind::GradientBoosting,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        if let Some(bad) = y.iter().find(|v| **v != 0.0 && **v != 1.0) {
            return Err(ModelError::InvalidLabel(*bad));
        }
        match self {
            Classifier::LogisticRegression(m) => m.fit(x, y),
            Classifier::GradientBoosting(m) => m.fit(x, y),
        }
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        match self {
            Classifier::LogisticRegression(m) => m.predict_proba(x),
            Classifier::GradientBoosting(m) => m.predict_proba(x),
        }
    }
}

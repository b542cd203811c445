//! End-to-end scoring pipeline and its persisted artifact

use super::classifier::{Classifier, ClassifierKind};
use super::params::ParamSet;
use super::ModelError;
use crate::data::Table;
use crate::feature_extractor::FeatureEngineer;
use crate::preprocess::Preprocessor;
use crate::types::CreditApplication;
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Version of the artifact layout written by [`ModelArtifact`]
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Split the target column off a table, returning predictors and 0/1 labels.
pub fn split_target(table: &Table, target: &str) -> Result<(Table, Array1<f64>), ModelError> {
    let mut predictors = table.clone();
    let labels = predictors.take_column(target)?;
    Ok((predictors, Array1::from_vec(labels)))
}

/// Feature engineering, preprocessing and classification as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPipeline {
    pub engineer: FeatureEngineer,
    pub preprocessor: Preprocessor,
    pub classifier: Classifier,
}

impl ScoringPipeline {
    /// Fit every step on raw predictor columns.
    pub fn fit(
        predictors: &Table,
        labels: &Array1<f64>,
        numeric_features: &[String],
        categorical_features: &[String],
        mut classifier: Classifier,
    ) -> Result<Self, ModelError> {
        let mut engineer = FeatureEngineer::new();
        let engineered = engineer.fit_transform(predictors)?;
        let preprocessor = Preprocessor::fit(&engineered, numeric_features, categorical_features)?;
        let x = preprocessor.transform(&engineered)?;
        classifier.fit(&x, labels)?;

        Ok(Self {
            engineer,
            preprocessor,
            classifier,
        })
    }

    /// Default probability per row of raw predictors
    pub fn predict_proba(&self, predictors: &Table) -> Result<Array1<f64>, ModelError> {
        let engineered = self.engineer.transform(predictors)?;
        let x = self.preprocessor.transform(&engineered)?;
        self.classifier.predict_proba(&x)
    }

    /// 0/1 labels: 1 where the probability exceeds 0.5
    pub fn predict(&self, predictors: &Table) -> Result<Array1<f64>, ModelError> {
        Ok(super::evaluation::threshold_predictions(
            &self.predict_proba(predictors)?,
            0.5,
        ))
    }

    pub fn feature_names_out(&self) -> Vec<String> {
        self.preprocessor.feature_names_out()
    }
}

/// Persisted model plus the metadata needed to serve and audit it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub classifier: ClassifierKind,
    pub best_params: ParamSet,
    /// Mean cross-validated ROC-AUC of the chosen parameters
    pub cv_score: Option<f64>,
    pub feature_names: Vec<String>,
    /// Experiment run that produced this artifact
    pub run_id: Option<String>,
    pub pipeline: ScoringPipeline,
}

impl ModelArtifact {
    pub fn new(pipeline: ScoringPipeline, best_params: ParamSet, cv_score: f64) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: Utc::now(),
            classifier: pipeline.classifier.kind(),
            best_params,
            cv_score: cv_score.is_finite().then_some(cv_score),
            feature_names: pipeline.feature_names_out(),
            run_id: None,
            pipeline,
        }
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = Some(run_id.to_string());
        self
    }

    pub fn predict_proba(&self, predictors: &Table) -> Result<Array1<f64>, ModelError> {
        self.pipeline.predict_proba(predictors)
    }

    /// Default probability for a single application
    pub fn score(&self, application: &CreditApplication) -> Result<f64, ModelError> {
        let table = CreditApplication::to_table(std::slice::from_ref(application));
        let proba = self.pipeline.predict_proba(&table)?;
        proba.first().copied().ok_or(ModelError::DimensionMismatch {
            expected: 1,
            got: 0,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::FeaturesConfig;
    use crate::models::params::ParamValue;

    /// Small synthetic applicant table where late payers default
    pub(crate) fn applicants(n: usize) -> (Table, Array1<f64>) {
        let apps: Vec<CreditApplication> = (0..n)
            .map(|i| {
                let mut app = CreditApplication::new(10_000.0 * (1 + i % 20) as f64, 21 + (i % 50) as i32);
                app.sex = 1 + (i % 2) as i32;
                app.education = 1 + (i % 4) as i32;
                app.marriage = 1 + (i % 3) as i32;
                let late = i % 3 == 0;
                app.pay_0 = if late { 2 } else { -1 };
                app.pay_2 = if late { 2 } else { 0 };
                app.bill_amt1 = 1_000.0 * (i % 7) as f64;
                app.pay_amt1 = if late { 0.0 } else { 500.0 };
                app
            })
            .collect();
        let labels = (0..n).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect();
        (CreditApplication::to_table(&apps), Array1::from_vec(labels))
    }

    fn fitted() -> ScoringPipeline {
        let (table, y) = applicants(90);
        let features = FeaturesConfig::default();
        let mut params = ParamSet::new();
        params.insert("classifier__C".into(), ParamValue::Number(1.0));
        let clf = ClassifierKind::LogisticRegression.build(&params).unwrap();
        ScoringPipeline::fit(
            &table,
            &y,
            &features.numeric_features,
            &features.categorical_features,
            clf,
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_scores_raw_applications() {
        let pipeline = fitted();
        let (table, y) = applicants(90);

        let predictions = pipeline.predict(&table).unwrap();
        let correct = predictions.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        assert!(correct >= 85, "only {correct} of 90 correct");
    }

    #[test]
    fn test_artifact_json_roundtrip_keeps_scores() {
        let artifact = ModelArtifact::new(fitted(), ParamSet::new(), 0.9).with_run_id("abc");
        let json = serde_json::to_string(&artifact).unwrap();
        let restored: ModelArtifact = serde_json::from_str(&json).unwrap();

        let (table, _) = applicants(10);
        let a = artifact.predict_proba(&table).unwrap();
        let b = restored.predict_proba(&table).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
        assert_eq!(restored.run_id.as_deref(), Some("abc"));
        assert_eq!(restored.classifier, ClassifierKind::LogisticRegression);
        assert_eq!(restored.feature_names, artifact.pipeline.feature_names_out());
    }

    #[test]
    fn test_single_application_score() {
        let artifact = ModelArtifact::new(fitted(), ParamSet::new(), f64::NAN);
        assert!(artifact.cv_score.is_none());

        let mut late = CreditApplication::new(20_000.0, 30);
        late.pay_0 = 2;
        late.pay_2 = 2;
        let score = artifact.score(&late).unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert!(score > artifact.score(&CreditApplication::new(20_000.0, 30)).unwrap());
    }

    #[test]
    fn test_split_target() {
        let (mut table, y) = applicants(3);
        table.add_column("default", y.to_vec()).unwrap();
        let (predictors, labels) = split_target(&table, "default").unwrap();
        assert!(!predictors.has_column("default"));
        assert_eq!(labels.len(), 3);
        assert!(split_target(&predictors, "default").is_err());
    }
}

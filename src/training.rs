//! Model training: grid search, held-out evaluation and artifact export,
//! recorded as one experiment run.

use crate::config::AppConfig;
use crate::data::Table;
use crate::drift::ReferenceDistribution;
use crate::models::evaluation::ClassificationReport;
use crate::models::params::{to_string_map, ParamSet};
use crate::models::pipeline::split_target;
use crate::models::{ClassifierKind, GridSearch, ModelArtifact, ModelLoader};
use crate::tracking::{ActiveRun, ExperimentTracker, RunStatus};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// Summary of a finished training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub run_id: String,
    pub classifier: ClassifierKind,
    pub best_params: ParamSet,
    pub best_cv_score: f64,
    pub test: ClassificationReport,
    pub train_rows: usize,
    pub test_rows: usize,
    pub model_path: PathBuf,
    pub reference_path: PathBuf,
}

/// Train, evaluate and export the configured classifier.
///
/// The run is marked `FAILED` if any step errors.
pub fn train_model(config: &AppConfig) -> Result<TrainingReport> {
    let tracker = ExperimentTracker::new(&config.tracking.tracking_dir, &config.tracking.experiment_name)?;
    let mut run = tracker.start_run()?;

    match run_training(config, &mut run) {
        Ok(report) => {
            run.finish(RunStatus::Finished)?;
            Ok(report)
        }
        Err(e) => {
            error!(run_id = %run.run_id(), error = %e, "Training failed");
            if let Err(finish_err) = run.finish(RunStatus::Failed) {
                warn!(error = %finish_err, "Failed to mark run as failed");
            }
            Err(e)
        }
    }
}

fn run_training(config: &AppConfig, run: &mut ActiveRun) -> Result<TrainingReport> {
    let start = Instant::now();
    let kind: ClassifierKind = config.model.classifier.parse()?;
    let grid = config
        .model
        .grid()
        .with_context(|| format!("No hyperparameter grid configured for {}", kind))?
        .clone();
    let target = &config.features.target;

    run.log_param("classifier", kind)?;
    run.log_param("cv_folds", config.model.cv_folds)?;
    run.log_param("test_size", config.data.test_size)?;
    run.log_param("random_state", config.data.random_state)?;

    let train_path = config.data.train_path();
    let train = Table::read_csv(&train_path)
        .with_context(|| format!("Failed to read training data from {}", train_path.display()))?;
    let (train_x, train_y) = split_target(&train, target)?;
    info!(
        rows = train_x.n_rows(),
        positives = train_y.sum() as u64,
        classifier = %kind,
        "Training data loaded"
    );

    let search = GridSearch::new(
        kind,
        grid,
        config.model.cv_folds,
        config.features.numeric_features.clone(),
        config.features.categorical_features.clone(),
    );
    let result = search.fit(&train_x, &train_y)?;

    run.log_params(to_string_map(&result.best_params))?;
    run.log_metric("best_cv_score", result.best_score)?;
    run.log_artifact_json("cv_results.json", &result.cv_results)?;

    let test_path = config.data.test_path();
    let test = Table::read_csv(&test_path)
        .with_context(|| format!("Failed to read test data from {}", test_path.display()))?;
    let (test_x, test_y) = split_target(&test, target)?;
    let test_proba = result.best_pipeline.predict_proba(&test_x)?;
    let evaluation = ClassificationReport::evaluate(&test_y, &test_proba, config.server.threshold);

    run.log_metrics(evaluation.tracked_metrics())?;
    run.log_artifact_json("classification_report.json", &evaluation)?;
    info!(
        roc_auc = evaluation.roc_auc,
        precision = evaluation.precision,
        recall = evaluation.recall,
        f1 = evaluation.f1,
        "Test set evaluation"
    );

    let reference_proba = result.best_pipeline.predict_proba(&train_x)?;
    let reference = ReferenceDistribution::new(reference_proba.to_vec()).with_run_id(run.run_id());
    let reference_path = PathBuf::from(&config.model.reference_path);
    reference.save(&reference_path)?;
    run.log_artifact_file(&reference_path)?;

    let artifact = ModelArtifact::new(result.best_pipeline, result.best_params.clone(), result.best_score)
        .with_run_id(run.run_id());
    let model_path = PathBuf::from(&config.model.model_path);
    ModelLoader::save(&artifact, &model_path)?;
    run.log_artifact_file(&model_path)?;

    info!(
        run_id = %run.run_id(),
        best_cv_score = result.best_score,
        test_roc_auc = evaluation.roc_auc,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "Training complete"
    );

    Ok(TrainingReport {
        run_id: run.run_id().to_string(),
        classifier: kind,
        best_params: result.best_params,
        best_cv_score: result.best_score,
        test: evaluation,
        train_rows: train_x.n_rows(),
        test_rows: test_x.n_rows(),
        model_path,
        reference_path,
    })
}

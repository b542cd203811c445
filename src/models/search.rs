//! Exhaustive hyperparameter search with stratified cross-validation
//!
//! Every candidate of the grid is scored by mean ROC-AUC over `k`
//! stratified folds. The preprocessor is refit on each training fold so no
//! statistics leak from the held-out fold. Candidate/fold pairs are
//! evaluated in parallel with rayon.

use super::classifier::ClassifierKind;
use super::evaluation::roc_auc;
use super::params::{expand_grid, ParamGrid, ParamSet};
use super::pipeline::ScoringPipeline;
use super::ModelError;
use crate::data::Table;
use crate::feature_extractor::FeatureEngineer;
use crate::preprocess::Preprocessor;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Train/validation row indices of one fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Stratified k-fold without shuffling.
///
/// The rows of each class are cut, in order, into `k` contiguous chunks
/// whose sizes differ by at most one; fold `i` holds out chunk `i` of every
/// class.
pub fn stratified_k_fold(labels: &Array1<f64>, k: usize) -> Result<Vec<FoldSplit>, ModelError> {
    if k < 2 {
        return Err(ModelError::InvalidParameter {
            name: "cv_folds".to_string(),
            value: k.to_string(),
        });
    }
    if labels.len() < k {
        return Err(ModelError::NotEnoughSamples {
            folds: k,
            rows: labels.len(),
        });
    }

    let mut test_sets: Vec<Vec<usize>> = vec![Vec::new(); k];
    for class in [0.0, 1.0] {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, y)| (**y >= 0.5) == (class >= 0.5))
            .map(|(i, _)| i)
            .collect();
        if !members.is_empty() && members.len() < k {
            warn!(
                class = class,
                members = members.len(),
                folds = k,
                "Least populated class has fewer members than folds"
            );
        }

        let base = members.len() / k;
        let extra = members.len() % k;
        let mut start = 0;
        for (fold, test) in test_sets.iter_mut().enumerate() {
            let size = base + usize::from(fold < extra);
            test.extend_from_slice(&members[start..start + size]);
            start += size;
        }
    }

    Ok(test_sets
        .into_iter()
        .map(|mut test| {
            test.sort_unstable();
            let train = (0..labels.len())
                .filter(|i| test.binary_search(i).is_err())
                .collect();
            FoldSplit {
                train_indices: train,
                test_indices: test,
            }
        })
        .collect())
}

/// Cross-validation outcome of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

/// Result of a completed search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    pub cv_results: Vec<CandidateScore>,
    /// Pipeline refit on all rows with the best parameters
    pub best_pipeline: ScoringPipeline,
}

/// Preprocessed matrices of one fold, shared by every candidate
struct PreparedFold {
    x_train: Array2<f64>,
    y_train: Array1<f64>,
    x_test: Array2<f64>,
    y_test: Array1<f64>,
}

/// Grid search over one classifier kind
#[derive(Debug, Clone)]
pub struct GridSearch {
    pub kind: ClassifierKind,
    pub grid: ParamGrid,
    pub folds: usize,
    pub numeric_features: Vec<String>,
    pub categorical_features: Vec<String>,
}

impl GridSearch {
    pub fn new(
        kind: ClassifierKind,
        grid: ParamGrid,
        folds: usize,
        numeric_features: Vec<String>,
        categorical_features: Vec<String>,
    ) -> Self {
        Self {
            kind,
            grid,
            folds,
            numeric_features,
            categorical_features,
        }
    }

    /// Score every candidate, then refit the best one on all rows.
    pub fn fit(&self, predictors: &Table, labels: &Array1<f64>) -> Result<SearchResult, ModelError> {
        let candidates = expand_grid(&self.grid);
        // Fail on bad parameter names before any fitting work
        for params in &candidates {
            self.kind.build(params)?;
        }

        let start = Instant::now();
        let splits = stratified_k_fold(labels, self.folds)?;
        let engineered = FeatureEngineer::new().transform(predictors)?;
        let folds = splits
            .iter()
            .map(|split| self.prepare_fold(&engineered, labels, split))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            classifier = %self.kind,
            candidates = candidates.len(),
            folds = folds.len(),
            fits = candidates.len() * folds.len(),
            "Starting grid search"
        );

        let jobs: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
            .collect();
        let scores = jobs
            .par_iter()
            .map(|&(c, f)| {
                let fold = &folds[f];
                let mut clf = self.kind.build(&candidates[c])?;
                clf.fit(&fold.x_train, &fold.y_train)?;
                let proba = clf.predict_proba(&fold.x_test)?;
                Ok(roc_auc(&fold.y_test, &proba))
            })
            .collect::<Result<Vec<f64>, ModelError>>()?;

        let cv_results: Vec<CandidateScore> = candidates
            .into_iter()
            .enumerate()
            .map(|(c, params)| {
                let fold_scores = scores[c * folds.len()..(c + 1) * folds.len()].to_vec();
                let (mean_score, std_score) = mean_std(&fold_scores);
                debug!(params = ?params, mean_score = mean_score, "Candidate scored");
                CandidateScore {
                    params,
                    fold_scores,
                    mean_score,
                    std_score,
                }
            })
            .collect();

        let best = best_candidate(&cv_results);
        let best_params = cv_results[best].params.clone();
        let best_score = cv_results[best].mean_score;

        info!(
            best_params = ?best_params,
            best_score = best_score,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Grid search finished, refitting best candidate"
        );

        let best_pipeline = ScoringPipeline::fit(
            predictors,
            labels,
            &self.numeric_features,
            &self.categorical_features,
            self.kind.build(&best_params)?,
        )?;

        Ok(SearchResult {
            best_params,
            best_score,
            cv_results,
            best_pipeline,
        })
    }

    fn prepare_fold(
        &self,
        engineered: &Table,
        labels: &Array1<f64>,
        split: &FoldSplit,
    ) -> Result<PreparedFold, ModelError> {
        let train = engineered.select_rows(&split.train_indices);
        let test = engineered.select_rows(&split.test_indices);
        let preprocessor = Preprocessor::fit(&train, &self.numeric_features, &self.categorical_features)?;

        Ok(PreparedFold {
            x_train: preprocessor.transform(&train)?,
            y_train: split.train_indices.iter().map(|&i| labels[i]).collect(),
            x_test: preprocessor.transform(&test)?,
            y_test: split.test_indices.iter().map(|&i| labels[i]).collect(),
        })
    }
}

/// Index of the candidate with the highest mean score.
///
/// The first candidate wins ties and a NaN mean never wins. Falls back to 0
/// when every mean is NaN.
pub fn best_candidate(cv_results: &[CandidateScore]) -> usize {
    let mut best = 0;
    for (i, candidate) in cv_results.iter().enumerate() {
        let current = cv_results[best].mean_score;
        if candidate.mean_score > current || (current.is_nan() && !candidate.mean_score.is_nan()) {
            best = i;
        }
    }
    best
}

/// Mean and population standard deviation
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

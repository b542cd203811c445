//! Prediction drift monitoring.
//!
//! Compares live default probabilities returned by the prediction service
//! against the training-time reference distribution using the Population
//! Stability Index (PSI) and the two-sample Kolmogorov-Smirnov statistic.

use crate::config::{AppConfig, DriftConfig};
use crate::data::Table;
use crate::types::{CreditApplication, PredictionResponse};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fraction substituted for empty histogram bins
const EMPTY_BIN_FRACTION: f64 = 0.001;

/// Errors from the drift statistics
#[derive(Debug, Error, PartialEq)]
pub enum DriftError {
    #[error("{0} distribution is empty")]
    EmptyInput(&'static str),

    #[error("number of buckets must be positive")]
    NoBuckets,
}

/// Drift verdict for a PSI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftStatus {
    Stable,
    Moderate,
    Significant,
}

impl DriftStatus {
    /// Classify a PSI value; both thresholds are strict
    pub fn classify(psi: f64, moderate: f64, significant: f64) -> Self {
        if psi > significant {
            DriftStatus::Significant
        } else if psi > moderate {
            DriftStatus::Moderate
        } else {
            DriftStatus::Stable
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DriftStatus::Stable => "No significant drift detected",
            DriftStatus::Moderate => "Moderate drift detected",
            DriftStatus::Significant => "Significant drift detected",
        }
    }
}

/// Fraction of `values` in each of `buckets` equal-width bins over [0, 1].
///
/// Bins are right-open except the last, which also holds 1.0. Values outside
/// [0, 1] are not binned but still count towards the total.
fn bin_fractions(values: &[f64], buckets: usize) -> Vec<f64> {
    let step = 1.0 / buckets as f64;
    let inner_edges: Vec<f64> = (1..buckets).map(|i| i as f64 * step).collect();

    let mut counts = vec![0usize; buckets];
    for &v in values {
        if (0.0..=1.0).contains(&v) {
            counts[inner_edges.partition_point(|e| *e <= v)] += 1;
        }
    }

    let total = values.len() as f64;
    counts
        .into_iter()
        .map(|c| {
            let fraction = c as f64 / total;
            if fraction == 0.0 {
                EMPTY_BIN_FRACTION
            } else {
                fraction
            }
        })
        .collect()
}

/// Population Stability Index between two probability samples.
pub fn calculate_psi(expected: &[f64], actual: &[f64], buckets: usize) -> Result<f64, DriftError> {
    if buckets == 0 {
        return Err(DriftError::NoBuckets);
    }
    if expected.is_empty() {
        return Err(DriftError::EmptyInput("expected"));
    }
    if actual.is_empty() {
        return Err(DriftError::EmptyInput("actual"));
    }

    let e = bin_fractions(expected, buckets);
    let a = bin_fractions(actual, buckets);
    Ok(e.iter().zip(&a).map(|(e, a)| (e - a) * (e / a).ln()).sum())
}

/// Two-sample Kolmogorov-Smirnov statistic: the largest gap between the
/// empirical CDFs. NaN values are ignored.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> Result<f64, DriftError> {
    let sorted = |v: &[f64]| {
        let mut s: Vec<f64> = v.iter().copied().filter(|x| !x.is_nan()).collect();
        s.sort_by(|x, y| x.total_cmp(y));
        s
    };
    let (a, b) = (sorted(a), sorted(b));
    if a.is_empty() {
        return Err(DriftError::EmptyInput("first"));
    }
    if b.is_empty() {
        return Err(DriftError::EmptyInput("second"));
    }

    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    Ok(d)
}

/// Training-time probabilities used as the drift baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDistribution {
    pub created_at: DateTime<Utc>,
    pub run_id: Option<String>,
    pub probabilities: Vec<f64>,
}

impl ReferenceDistribution {
    pub fn new(probabilities: Vec<f64>) -> Self {
        Self {
            created_at: Utc::now(),
            run_id: None,
            probabilities,
        }
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = Some(run_id.to_string());
        self
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)
            .with_context(|| format!("Failed to write reference distribution to {}", path.display()))?;
        info!(path = %path.display(), size = self.probabilities.len(), "Reference distribution saved");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference distribution from {}", path.display()))?;
        let reference: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse reference distribution {}", path.display()))?;
        if reference.probabilities.is_empty() {
            bail!("Reference distribution {} is empty", path.display());
        }
        Ok(reference)
    }
}

/// HTTP client for the prediction service
#[derive(Debug, Clone)]
pub struct ScoringClient {
    client: reqwest::Client,
    predict_url: String,
}

impl ScoringClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            predict_url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }

    /// Score one application; `None` when the service answers with a non-200 status.
    pub async fn predict(&self, application: &CreditApplication) -> Result<Option<PredictionResponse>> {
        let response = self
            .client
            .post(&self.predict_url)
            .json(application)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.predict_url))?;

        if response.status() != reqwest::StatusCode::OK {
            warn!(status = %response.status(), "Prediction request rejected");
            return Ok(None);
        }
        Ok(Some(response.json().await.context("Invalid prediction response")?))
    }
}

/// Outcome of a drift check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    pub generated_at: DateTime<Utc>,
    pub reference_size: usize,
    pub requested: usize,
    pub predictions: usize,
    pub failed_requests: usize,
    pub psi: f64,
    pub ks_statistic: f64,
    pub status: DriftStatus,
    pub reference_mean: f64,
    pub current_mean: f64,
}

/// Samples test rows, scores them through the service and compares the
/// resulting probabilities to the reference distribution.
pub struct DriftMonitor {
    config: DriftConfig,
    client: ScoringClient,
}

impl DriftMonitor {
    pub fn new(config: DriftConfig) -> Result<Self> {
        let client = ScoringClient::new(
            &config.service_url,
            Duration::from_millis(config.request_timeout_ms),
        )?;
        Ok(Self { config, client })
    }

    /// Seeded sample without replacement, capped at the table size
    pub fn sample_rows(&self, table: &Table) -> Table {
        let n = table.n_rows();
        let k = self.config.sample_size.min(n);
        let mut rng = StdRng::seed_from_u64(self.config.random_state);
        let mut indices = rand::seq::index::sample(&mut rng, n, k).into_vec();
        indices.sort_unstable();
        table.select_rows(&indices)
    }

    /// Score `table` row by row, sequentially, keeping only successful predictions.
    pub async fn collect_predictions(&self, table: &Table) -> (Vec<f64>, usize) {
        let mut probabilities = Vec::with_capacity(table.n_rows());
        let mut failed = 0;

        for row in 0..table.n_rows() {
            let application = match CreditApplication::from_table_row(table, row) {
                Ok(app) => app,
                Err(e) => {
                    warn!(row = row, error = %e, "Skipping row that is not a valid application");
                    failed += 1;
                    continue;
                }
            };
            match self.client.predict(&application).await {
                Ok(Some(response)) => probabilities.push(response.probability),
                Ok(None) => failed += 1,
                Err(e) => {
                    warn!(row = row, error = %e, "Prediction request failed");
                    failed += 1;
                }
            }
            if (row + 1) % 100 == 0 {
                debug!(scored = row + 1, "Drift sampling progress");
            }
        }
        (probabilities, failed)
    }

    /// Compare `current` probabilities against `reference`.
    pub fn evaluate(&self, reference: &[f64], current: &[f64], requested: usize, failed: usize) -> Result<DriftReport> {
        if current.is_empty() {
            bail!("No successful predictions to compare against the reference");
        }
        let psi = calculate_psi(reference, current, self.config.buckets)?;
        let ks = ks_statistic(reference, current)?;
        let status = DriftStatus::classify(
            psi,
            self.config.moderate_threshold,
            self.config.significant_threshold,
        );
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;

        Ok(DriftReport {
            generated_at: Utc::now(),
            reference_size: reference.len(),
            requested,
            predictions: current.len(),
            failed_requests: failed,
            psi,
            ks_statistic: ks,
            status,
            reference_mean: mean(reference),
            current_mean: mean(current),
        })
    }
}

/// Run a full drift check against the configured service.
pub async fn monitor_drift(config: &AppConfig) -> Result<DriftReport> {
    let reference = ReferenceDistribution::load(&config.model.reference_path)?;

    let test_path = config.data.test_path();
    let mut test = Table::read_csv(&test_path)
        .with_context(|| format!("Failed to read {}", test_path.display()))?;
    if test.has_column(&config.features.target) {
        test.drop_column(&config.features.target)?;
    }

    let monitor = DriftMonitor::new(config.drift.clone())?;
    let sample = monitor.sample_rows(&test);
    info!(
        rows = sample.n_rows(),
        service = %config.drift.service_url,
        "Requesting predictions for drift check"
    );

    let (current, failed) = monitor.collect_predictions(&sample).await;
    let report = monitor.evaluate(&reference.probabilities, &current, sample.n_rows(), failed)?;

    match report.status {
        DriftStatus::Stable => info!(psi = report.psi, ks = report.ks_statistic, "{}", report.status.describe()),
        _ => warn!(psi = report.psi, ks = report.ks_statistic, "{}", report.status.describe()),
    }

    if let Some(path) = &config.drift.report_path {
        let path = Path::new(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write drift report to {}", path.display()))?;
        info!(path = %path.display(), "Drift report written");
    }

    Ok(report)
}

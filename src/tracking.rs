//! File-backed experiment tracking.
//!
//! Runs live under `<tracking_dir>/<experiment>/<run_id>/` as
//! `meta.json`, `params.json`, `metrics.json` and an `artifacts/` directory.
//! Every log call rewrites the affected file, so an interrupted training job
//! still leaves a readable record.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const META_FILE: &str = "meta.json";
const PARAMS_FILE: &str = "params.json";
const METRICS_FILE: &str = "metrics.json";
const ARTIFACTS_DIR: &str = "artifacts";

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// Run metadata stored in `meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment: String,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// One recorded value of a metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub step: u64,
}

/// Everything recorded for a run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub info: RunInfo,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, Vec<MetricPoint>>,
}

impl RunRecord {
    /// Most recent value of a metric
    pub fn latest_metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(|h| h.last()).map(|p| p.value)
    }
}

/// Tracker for one named experiment
#[derive(Debug, Clone)]
pub struct ExperimentTracker {
    experiment: String,
    root: PathBuf,
}

impl ExperimentTracker {
    pub fn new<P: AsRef<Path>>(tracking_dir: P, experiment: &str) -> Result<Self> {
        if experiment.trim().is_empty() {
            bail!("Experiment name must not be empty");
        }
        let root = tracking_dir.as_ref().join(experiment);
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create tracking directory {}", root.display()))?;

        Ok(Self {
            experiment: experiment.to_string(),
            root,
        })
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Start a new run with a fresh id
    pub fn start_run(&self) -> Result<ActiveRun> {
        let run_id = Uuid::new_v4().simple().to_string();
        let dir = self.root.join(&run_id);
        fs::create_dir_all(dir.join(ARTIFACTS_DIR))
            .with_context(|| format!("Failed to create run directory {}", dir.display()))?;

        let run = ActiveRun {
            info: RunInfo {
                run_id,
                experiment: self.experiment.clone(),
                status: RunStatus::Running,
                start_time: Utc::now(),
                end_time: None,
            },
            dir,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
        };
        run.write_meta()?;
        run.write_params()?;
        run.write_metrics()?;

        info!(experiment = %self.experiment, run_id = %run.info.run_id, "Run started");
        Ok(run)
    }

    /// Metadata of every run, oldest first
    pub fn list_runs(&self) -> Result<Vec<RunInfo>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list {}", self.root.display()))?
        {
            let path = entry?.path().join(META_FILE);
            if path.is_file() {
                runs.push(read_json::<RunInfo>(&path)?);
            }
        }
        runs.sort_by_key(|r| r.start_time);
        Ok(runs)
    }

    /// Full record of one run
    pub fn load_run(&self, run_id: &str) -> Result<RunRecord> {
        let dir = self.root.join(run_id);
        if !dir.is_dir() {
            bail!("Run {} not found in experiment {}", run_id, self.experiment);
        }
        Ok(RunRecord {
            info: read_json(&dir.join(META_FILE))?,
            params: read_json(&dir.join(PARAMS_FILE))?,
            metrics: read_json(&dir.join(METRICS_FILE))?,
        })
    }
}

/// A run that is being recorded
#[derive(Debug)]
pub struct ActiveRun {
    info: RunInfo,
    dir: PathBuf,
    params: BTreeMap<String, String>,
    metrics: BTreeMap<String, Vec<MetricPoint>>,
}

impl ActiveRun {
    pub fn run_id(&self) -> &str {
        &self.info.run_id
    }

    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.dir.join(ARTIFACTS_DIR)
    }

    pub fn log_param<V: Display>(&mut self, key: &str, value: V) -> Result<()> {
        let value = value.to_string();
        if let Some(previous) = self.params.insert(key.to_string(), value.clone()) {
            if previous != value {
                warn!(param = %key, previous = %previous, value = %value, "Parameter overwritten");
            }
        }
        self.write_params()
    }

    pub fn log_params<I, K, V>(&mut self, params: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Display,
    {
        for (key, value) in params {
            self.params.insert(key.as_ref().to_string(), value.to_string());
        }
        self.write_params()
    }

    /// Append a metric value; the step is its position in the history.
    pub fn log_metric(&mut self, key: &str, value: f64) -> Result<()> {
        let step = self.metrics.get(key).map_or(0, |h| h.len() as u64);
        self.log_metric_at(key, value, step)
    }

    pub fn log_metric_at(&mut self, key: &str, value: f64, step: u64) -> Result<()> {
        if self.push_metric(key, value, step) {
            self.write_metrics()?;
        }
        Ok(())
    }

    pub fn log_metrics<'a, I>(&mut self, metrics: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        for (key, value) in metrics {
            let step = self.metrics.get(key).map_or(0, |h| h.len() as u64);
            self.push_metric(key, value, step);
        }
        self.write_metrics()
    }

    fn push_metric(&mut self, key: &str, value: f64, step: u64) -> bool {
        if !value.is_finite() {
            warn!(metric = %key, value = value, "Skipping non-finite metric");
            return false;
        }
        debug!(metric = %key, value = value, step = step, "Metric logged");
        self.metrics.entry(key.to_string()).or_default().push(MetricPoint {
            value,
            timestamp: Utc::now(),
            step,
        });
        true
    }

    /// Serialize `value` into `artifacts/<name>`
    pub fn log_artifact_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.artifacts_dir().join(name);
        write_json(&path, value)?;
        debug!(artifact = %name, run_id = %self.info.run_id, "Artifact logged");
        Ok(path)
    }

    /// Copy an existing file into `artifacts/`
    pub fn log_artifact_file<P: AsRef<Path>>(&self, source: P) -> Result<PathBuf> {
        let source = source.as_ref();
        let name = source
            .file_name()
            .with_context(|| format!("Artifact path {} has no file name", source.display()))?;
        let target = self.artifacts_dir().join(name);
        fs::copy(source, &target)
            .with_context(|| format!("Failed to copy artifact {}", source.display()))?;
        debug!(artifact = %target.display(), run_id = %self.info.run_id, "Artifact logged");
        Ok(target)
    }

    /// Close the run with a final status
    pub fn finish(mut self, status: RunStatus) -> Result<RunInfo> {
        self.info.status = status;
        self.info.end_time = Some(Utc::now());
        self.write_meta()?;
        info!(run_id = %self.info.run_id, status = ?status, "Run finished");
        Ok(self.info)
    }

    fn write_meta(&self) -> Result<()> {
        write_json(&self.dir.join(META_FILE), &self.info)
    }

    fn write_params(&self) -> Result<()> {
        write_json(&self.dir.join(PARAMS_FILE), &self.params)
    }

    fn write_metrics(&self) -> Result<()> {
        write_json(&self.dir.join(METRICS_FILE), &self.metrics)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

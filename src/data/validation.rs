//! Declarative data validation with expectation suites
//!
//! A suite is a named list of expectations stored as JSON. Validating a table
//! evaluates every expectation and produces a report; a report with any
//! failed expectation converts into a [`ValidationError`].

use super::Table;
use crate::config::{DataConfig, FeaturesConfig};
use crate::types::PREDICTOR_COLUMNS;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Raised when a validation run has failing expectations
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("data validation failed: {failed} of {total} expectations in suite {suite} did not pass")]
    Failed {
        suite: String,
        failed: usize,
        total: usize,
    },
}

/// One declarative check over a table.
///
/// Value checks skip missing cells; use `NotNull` to forbid them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// Every listed column is present
    ColumnsExist { columns: Vec<String> },
    /// No missing values in the column
    NotNull { column: String },
    /// Every value belongs to `values`
    InSet { column: String, values: Vec<f64> },
    /// Every value lies in `[min, max]`; an absent bound is unbounded
    Between {
        column: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Row count lies in `[min, max]`
    RowCount {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
    /// No value appears twice in the column
    Unique { column: String },
}

/// Outcome of a single expectation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationResult {
    pub expectation: Expectation,
    pub success: bool,
    /// Values (or columns, or rows) inspected
    pub element_count: usize,
    /// Values violating the expectation
    pub unexpected_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ExpectationResult {
    fn counted(expectation: &Expectation, element_count: usize, unexpected_count: usize) -> Self {
        Self {
            expectation: expectation.clone(),
            success: unexpected_count == 0,
            element_count,
            unexpected_count,
            detail: None,
        }
    }

    fn failed(expectation: &Expectation, detail: String) -> Self {
        Self {
            expectation: expectation.clone(),
            success: false,
            element_count: 0,
            unexpected_count: 0,
            detail: Some(detail),
        }
    }
}

impl Expectation {
    fn evaluate(&self, table: &Table) -> ExpectationResult {
        match self {
            Expectation::ColumnsExist { columns } => {
                let missing: Vec<&str> = columns
                    .iter()
                    .filter(|c| !table.has_column(c))
                    .map(String::as_str)
                    .collect();
                let mut result = ExpectationResult::counted(self, columns.len(), missing.len());
                if !missing.is_empty() {
                    result.detail = Some(format!("missing columns: {}", missing.join(", ")));
                }
                result
            }
            Expectation::NotNull { column } => self.check_values(table, column, true, |v| !v.is_nan()),
            Expectation::InSet { column, values } => {
                self.check_values(table, column, false, |v| values.contains(&v))
            }
            Expectation::Between { column, min, max } => self.check_values(table, column, false, |v| {
                min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m)
            }),
            Expectation::RowCount { min, max } => {
                let n = table.n_rows();
                let ok = min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m);
                let mut result = ExpectationResult::counted(self, n, usize::from(!ok));
                if !ok {
                    result.detail = Some(format!("row count {n} outside [{min:?}, {max:?}]"));
                }
                result
            }
            Expectation::Unique { column } => match table.column(column) {
                Ok(values) => {
                    let mut seen = HashSet::with_capacity(values.len());
                    let present: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
                    let duplicates = present.iter().filter(|v| !seen.insert(v.to_bits())).count();
                    ExpectationResult::counted(self, present.len(), duplicates)
                }
                Err(e) => ExpectationResult::failed(self, e.to_string()),
            },
        }
    }

    fn check_values<F: Fn(f64) -> bool>(
        &self,
        table: &Table,
        column: &str,
        include_missing: bool,
        ok: F,
    ) -> ExpectationResult {
        match table.column(column) {
            Ok(values) => {
                let inspected: Vec<f64> = values
                    .into_iter()
                    .filter(|v| include_missing || !v.is_nan())
                    .collect();
                let unexpected = inspected.iter().filter(|&&v| !ok(v)).count();
                ExpectationResult::counted(self, inspected.len(), unexpected)
            }
            Err(e) => ExpectationResult::failed(self, e.to_string()),
        }
    }
}

/// Summary counters of a validation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationStatistics {
    pub evaluated: usize,
    pub successful: usize,
    pub unsuccessful: usize,
}

/// Results of running a suite over one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub suite_name: String,
    pub run_id: String,
    pub evaluated_at: DateTime<Utc>,
    pub success: bool,
    pub statistics: ValidationStatistics,
    pub results: Vec<ExpectationResult>,
}

impl ValidationReport {
    /// Failed expectations only
    pub fn failures(&self) -> impl Iterator<Item = &ExpectationResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Turn a failed report into an error
    pub fn into_result(self) -> Result<Self, ValidationError> {
        if self.success {
            Ok(self)
        } else {
            Err(ValidationError::Failed {
                suite: self.suite_name,
                failed: self.statistics.unsuccessful,
                total: self.statistics.evaluated,
            })
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Named collection of expectations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSuite {
    pub name: String,
    pub expectations: Vec<Expectation>,
}

impl ExpectationSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            expectations: Vec::new(),
        }
    }

    pub fn expect(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    /// Suite for the processed credit dataset (after ID drop and target rename)
    pub fn credit_default(features: &FeaturesConfig) -> Self {
        let mut columns: Vec<String> = PREDICTOR_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.push(features.target.clone());

        let mut suite = Self::new("credit_default")
            .expect(Expectation::RowCount { min: Some(1), max: None })
            .expect(Expectation::ColumnsExist { columns })
            .expect(Expectation::NotNull {
                column: features.target.clone(),
            })
            .expect(Expectation::InSet {
                column: features.target.clone(),
                values: vec![0.0, 1.0],
            })
            .expect(Expectation::Between {
                column: "LIMIT_BAL".to_string(),
                min: Some(0.0),
                max: None,
            })
            .expect(Expectation::Between {
                column: "AGE".to_string(),
                min: Some(18.0),
                max: Some(100.0),
            })
            .expect(Expectation::InSet {
                column: "SEX".to_string(),
                values: vec![1.0, 2.0],
            })
            .expect(Expectation::Between {
                column: "EDUCATION".to_string(),
                min: Some(0.0),
                max: Some(6.0),
            })
            .expect(Expectation::Between {
                column: "MARRIAGE".to_string(),
                min: Some(0.0),
                max: Some(3.0),
            });

        for pay in ["PAY_0", "PAY_2", "PAY_3", "PAY_4", "PAY_5", "PAY_6"] {
            suite = suite.expect(Expectation::Between {
                column: pay.to_string(),
                min: Some(-2.0),
                max: Some(9.0),
            });
        }
        for i in 1..=6 {
            suite = suite.expect(Expectation::Between {
                column: format!("PAY_AMT{i}"),
                min: Some(0.0),
                max: None,
            });
        }
        suite
    }

    /// Suite for the raw file as downloaded
    pub fn raw_credit_default(data: &DataConfig) -> Self {
        let mut columns = vec![data.id_column.clone()];
        columns.extend(PREDICTOR_COLUMNS.iter().map(|c| c.to_string()));
        columns.push(data.raw_target_column.clone());

        Self::new("raw_credit_default")
            .expect(Expectation::ColumnsExist { columns })
            .expect(Expectation::Unique {
                column: data.id_column.clone(),
            })
            .expect(Expectation::NotNull {
                column: data.raw_target_column.clone(),
            })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read expectation suite {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid expectation suite {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Evaluate every expectation against `table`
    pub fn validate(&self, table: &Table) -> ValidationReport {
        let now = Utc::now();
        let results: Vec<ExpectationResult> =
            self.expectations.iter().map(|e| e.evaluate(table)).collect();

        let successful = results.iter().filter(|r| r.success).count();
        let statistics = ValidationStatistics {
            evaluated: results.len(),
            successful,
            unsuccessful: results.len() - successful,
        };
        let success = statistics.unsuccessful == 0;

        let report = ValidationReport {
            suite_name: self.name.clone(),
            run_id: format!("validation_{}", now.format("%Y%m%d_%H%M%S")),
            evaluated_at: now,
            success,
            statistics,
            results,
        };

        if success {
            info!(
                suite = %self.name,
                expectations = report.statistics.evaluated,
                "Data validation passed"
            );
        } else {
            for failure in report.failures() {
                warn!(
                    suite = %self.name,
                    expectation = ?failure.expectation,
                    unexpected = failure.unexpected_count,
                    detail = failure.detail.as_deref().unwrap_or(""),
                    "Expectation failed"
                );
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CreditApplication;

    fn credit_table(n: usize) -> Table {
        let apps: Vec<CreditApplication> = (0..n)
            .map(|i| CreditApplication::new(10000.0 * (i + 1) as f64, 25 + i as i32))
            .collect();
        let mut table = CreditApplication::to_table(&apps);
        table
            .add_column("default", (0..n).map(|i| (i % 2) as f64).collect())
            .unwrap();
        table
    }

    #[test]
    fn test_valid_table_passes() {
        let suite = ExpectationSuite::credit_default(&FeaturesConfig::default());
        let report = suite.validate(&credit_table(10));

        assert!(report.success, "{:?}", report.failures().collect::<Vec<_>>());
        assert!(report.run_id.starts_with("validation_"));
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_out_of_range_values_fail() {
        let mut table = credit_table(4);
        table.set_value(0, "AGE", 150.0).unwrap();
        table.set_value(1, "default", 2.0).unwrap();

        let report = ExpectationSuite::credit_default(&FeaturesConfig::default()).validate(&table);
        assert!(!report.success);
        assert_eq!(report.statistics.unsuccessful, 2);

        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("data validation failed"));
    }

    #[test]
    fn test_missing_column_fails_with_detail() {
        let mut table = credit_table(3);
        table.drop_column("SEX").unwrap();

        let report = ExpectationSuite::credit_default(&FeaturesConfig::default()).validate(&table);
        let failures: Vec<_> = report.failures().collect();
        assert!(failures
            .iter()
            .any(|f| f.detail.as_deref() == Some("missing columns: SEX")));
    }

    #[test]
    fn test_value_checks_skip_missing_cells() {
        let table = Table::new(vec!["A".into()], vec![vec![1.0], vec![f64::NAN]]);
        let suite = ExpectationSuite::new("t")
            .expect(Expectation::InSet {
                column: "A".into(),
                values: vec![1.0],
            })
            .expect(Expectation::NotNull { column: "A".into() });

        let report = suite.validate(&table);
        assert!(report.results[0].success);
        assert!(!report.results[1].success);
        assert_eq!(report.results[1].unexpected_count, 1);
    }

    #[test]
    fn test_unique_detects_duplicates() {
        let table = Table::new(vec!["ID".into()], vec![vec![1.0], vec![2.0], vec![1.0]]);
        let report = ExpectationSuite::new("ids")
            .expect(Expectation::Unique { column: "ID".into() })
            .validate(&table);
        assert_eq!(report.results[0].unexpected_count, 1);
    }

    #[test]
    fn test_suite_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.json");
        let suite = ExpectationSuite::raw_credit_default(&DataConfig::default());

        suite.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"type\": \"unique\""));
        assert_eq!(ExpectationSuite::load(&path).unwrap(), suite);
    }
}

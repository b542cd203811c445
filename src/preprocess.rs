//! Column preprocessing: imputation, scaling and one-hot encoding
//!
//! Numeric columns are median-imputed and standard-scaled. Categorical
//! columns are imputed with 0 and one-hot encoded with the first category
//! dropped; categories unseen during fit encode as all zeros. Columns not
//! listed in either group are dropped.

use crate::data::{DataError, Table};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Fill value for missing categorical cells
const CATEGORICAL_FILL: f64 = 0.0;

/// Fitted statistics of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    pub median: f64,
    pub mean: f64,
    pub scale: f64,
}

/// Fitted categories of one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    /// Sorted distinct values seen during fit; the first one is dropped
    pub categories: Vec<f64>,
}

impl CategoricalColumn {
    /// Number of output columns
    fn width(&self) -> usize {
        self.categories.len().saturating_sub(1)
    }
}

/// Fitted column transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

impl Preprocessor {
    /// Learn imputation, scaling and category statistics from `table`.
    pub fn fit(
        table: &Table,
        numeric_features: &[String],
        categorical_features: &[String],
    ) -> Result<Self, DataError> {
        let numeric = numeric_features
            .iter()
            .map(|name| {
                let values = table.column(name)?;
                Ok(fit_numeric(name, &values))
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        let categorical = categorical_features
            .iter()
            .map(|name| {
                let values = table.column(name)?;
                Ok(fit_categorical(name, &values))
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        Ok(Self {
            numeric,
            categorical,
        })
    }

    /// Number of output features
    pub fn n_features_out(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.width()).sum::<usize>()
    }

    /// Output feature names: `num__<col>` then `cat__<col>_<category>`
    pub fn feature_names_out(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|c| format!("num__{}", c.name)).collect();
        for col in &self.categorical {
            for category in col.categories.iter().skip(1) {
                names.push(format!("cat__{}_{}", col.name, category));
            }
        }
        names
    }

    /// Transform a table into the dense design matrix.
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>, DataError> {
        let num_idx: Vec<usize> = self
            .numeric
            .iter()
            .map(|c| table.column_index(&c.name))
            .collect::<Result<_, _>>()?;
        let cat_idx: Vec<usize> = self
            .categorical
            .iter()
            .map(|c| table.column_index(&c.name))
            .collect::<Result<_, _>>()?;

        let mut out = Array2::<f64>::zeros((table.n_rows(), self.n_features_out()));

        for (r, row) in table.rows().iter().enumerate() {
            let mut j = 0;
            for (col, &idx) in self.numeric.iter().zip(&num_idx) {
                let raw = row[idx];
                let value = if raw.is_nan() { col.median } else { raw };
                out[[r, j]] = (value - col.mean) / col.scale;
                j += 1;
            }
            for (col, &idx) in self.categorical.iter().zip(&cat_idx) {
                let raw = row[idx];
                let value = if raw.is_nan() { CATEGORICAL_FILL } else { raw };
                if let Some(pos) = col.categories.iter().position(|&c| c == value) {
                    if pos > 0 {
                        out[[r, j + pos - 1]] = 1.0;
                    }
                }
                j += col.width();
            }
        }

        Ok(out)
    }
}

fn fit_numeric(name: &str, values: &[f64]) -> NumericColumn {
    let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    present.sort_by(|a, b| a.total_cmp(b));

    let median = match present.len() {
        0 => 0.0,
        n if n % 2 == 1 => present[n / 2],
        n => (present[n / 2 - 1] + present[n / 2]) / 2.0,
    };

    // Scaling statistics are computed on the imputed column.
    let n = values.len().max(1) as f64;
    let imputed = values.iter().map(|&v| if v.is_nan() { median } else { v });
    let mean = imputed.clone().sum::<f64>() / n;
    let variance = imputed.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    NumericColumn {
        name: name.to_string(),
        median,
        mean,
        scale: if std > f64::EPSILON { std } else { 1.0 },
    }
}

fn fit_categorical(name: &str, values: &[f64]) -> CategoricalColumn {
    let mut categories: Vec<f64> = values
        .iter()
        .map(|&v| if v.is_nan() { CATEGORICAL_FILL } else { v })
        .collect();
    categories.sort_by(|a, b| a.total_cmp(b));
    categories.dedup();

    CategoricalColumn {
        name: name.to_string(),
        categories,
    }
}

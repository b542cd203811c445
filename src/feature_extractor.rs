//! Feature engineering for credit default scoring.
//!
//! Derives aggregate and transformed columns from the raw predictors. The
//! transform is stateless, so training and serving share the exact same code.

use crate::data::{DataError, Table};
use serde::{Deserialize, Serialize};

/// Repayment status columns aggregated into `PAY_MEAN` / `PAY_STD`
pub const PAY_STATUS_COLUMNS: [&str; 6] = ["PAY_0", "PAY_2", "PAY_3", "PAY_4", "PAY_5", "PAY_6"];

/// Right-closed age bin edges; bin `i` covers `(edges[i], edges[i + 1]]`
pub const AGE_BIN_EDGES: [f64; 6] = [20.0, 30.0, 40.0, 50.0, 60.0, 100.0];

/// Columns added by [`FeatureEngineer::transform`]
pub const ENGINEERED_COLUMNS: [&str; 4] = ["PAY_MEAN", "PAY_STD", "AGE_BINNED", "LIMIT_BAL_LOG"];

/// Adds engineered columns to a predictor table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    /// No state is learned; kept so the engineer composes like other steps.
    pub fn fit(&mut self, _table: &Table) -> &mut Self {
        self
    }

    /// Return a copy of `table` with the engineered columns appended.
    pub fn transform(&self, table: &Table) -> Result<Table, DataError> {
        let pay_idx: Vec<usize> = PAY_STATUS_COLUMNS
            .iter()
            .map(|c| table.column_index(c))
            .collect::<Result<_, _>>()?;
        let age_idx = table.column_index("AGE")?;
        let limit_idx = table.column_index("LIMIT_BAL")?;

        let n = table.n_rows();
        let mut pay_mean = Vec::with_capacity(n);
        let mut pay_std = Vec::with_capacity(n);
        let mut age_binned = Vec::with_capacity(n);
        let mut limit_log = Vec::with_capacity(n);

        for row in table.rows() {
            let pays: Vec<f64> = pay_idx.iter().map(|&i| row[i]).collect();
            let (mean, std) = mean_and_sample_std(&pays);
            pay_mean.push(mean);
            pay_std.push(std);
            age_binned.push(age_bin(row[age_idx]));
            limit_log.push(row[limit_idx].ln_1p());
        }

        let mut out = table.clone();
        out.add_column("PAY_MEAN", pay_mean)?;
        out.add_column("PAY_STD", pay_std)?;
        out.add_column("AGE_BINNED", age_binned)?;
        out.add_column("LIMIT_BAL_LOG", limit_log)?;
        Ok(out)
    }

    pub fn fit_transform(&mut self, table: &Table) -> Result<Table, DataError> {
        self.fit(table);
        self.transform(table)
    }

    /// Names of the columns this engineer adds.
    pub fn feature_names(&self) -> Vec<&'static str> {
        ENGINEERED_COLUMNS.to_vec()
    }
}

/// Mean and `n - 1` standard deviation over the non-missing values.
fn mean_and_sample_std(values: &[f64]) -> (f64, f64) {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = present.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }

    let mean = present.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, f64::NAN);
    }
    let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, variance.sqrt())
}

/// Bin index of `age`, or NaN outside `(20, 100]`.
fn age_bin(age: f64) -> f64 {
    AGE_BIN_EDGES
        .windows(2)
        .position(|w| age > w[0] && age <= w[1])
        .map_or(f64::NAN, |i| i as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CreditApplication;

    #[test]
    fn test_engineered_columns() {
        let mut app = CreditApplication::new(50000.0, 35);
        app.pay_0 = 2;
        app.pay_2 = 2;
        app.pay_3 = 0;
        app.pay_4 = 0;
        app.pay_5 = -1;
        app.pay_6 = -1;
        let table = CreditApplication::to_table(&[app]);

        let out = FeatureEngineer::new().transform(&table).unwrap();

        assert_eq!(out.n_cols(), table.n_cols() + 4);
        assert!((out.value(0, "PAY_MEAN").unwrap() - 1.0 / 3.0).abs() < 1e-12);
        let expected_std = {
            let m = 1.0 / 3.0;
            let ss: f64 = [2.0, 2.0, 0.0, 0.0, -1.0, -1.0]
                .iter()
                .map(|v: &f64| (v - m).powi(2))
                .sum();
            (ss / 5.0).sqrt()
        };
        assert!((out.value(0, "PAY_STD").unwrap() - expected_std).abs() < 1e-12);
        assert_eq!(out.value(0, "AGE_BINNED").unwrap(), 1.0);
        assert!((out.value(0, "LIMIT_BAL_LOG").unwrap() - 50001f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_age_bins_are_right_closed() {
        assert!(age_bin(20.0).is_nan());
        assert_eq!(age_bin(21.0), 0.0);
        assert_eq!(age_bin(30.0), 0.0);
        assert_eq!(age_bin(30.5), 1.0);
        assert_eq!(age_bin(60.0), 3.0);
        assert_eq!(age_bin(100.0), 4.0);
        assert!(age_bin(101.0).is_nan());
        assert!(age_bin(f64::NAN).is_nan());
    }

    #[test]
    fn test_statistics_skip_missing_values() {
        let (mean, std) = mean_and_sample_std(&[1.0, f64::NAN, 3.0]);
        assert_eq!(mean, 2.0);
        assert!((std - 2f64.sqrt()).abs() < 1e-12);

        let (mean, std) = mean_and_sample_std(&[4.0, f64::NAN]);
        assert_eq!(mean, 4.0);
        assert!(std.is_nan());

        let (mean, _) = mean_and_sample_std(&[f64::NAN]);
        assert!(mean.is_nan());
    }

    #[test]
    fn test_missing_input_column_is_an_error() {
        let mut table = CreditApplication::to_table(&[CreditApplication::new(1.0, 30)]);
        table.drop_column("PAY_4").unwrap();

        let err = FeatureEngineer::new().transform(&table).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(c) if c == "PAY_4"));
    }

    #[test]
    fn test_feature_names() {
        assert_eq!(FeatureEngineer::new().feature_names().len(), 4);
    }
}

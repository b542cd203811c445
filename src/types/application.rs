//! Credit application records scored by the prediction service

use crate::data::{DataError, Table};
use serde::{Deserialize, Serialize};

/// Predictor columns in dataset order.
pub const PREDICTOR_COLUMNS: [&str; 23] = [
    "LIMIT_BAL",
    "SEX",
    "EDUCATION",
    "MARRIAGE",
    "AGE",
    "PAY_0",
    "PAY_2",
    "PAY_3",
    "PAY_4",
    "PAY_5",
    "PAY_6",
    "BILL_AMT1",
    "BILL_AMT2",
    "BILL_AMT3",
    "BILL_AMT4",
    "BILL_AMT5",
    "BILL_AMT6",
    "PAY_AMT1",
    "PAY_AMT2",
    "PAY_AMT3",
    "PAY_AMT4",
    "PAY_AMT5",
    "PAY_AMT6",
];

/// A single credit application with the 23 predictors of the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditApplication {
    /// Credit limit
    #[serde(rename = "LIMIT_BAL")]
    pub limit_bal: f64,

    /// Sex (1 = male, 2 = female)
    #[serde(rename = "SEX")]
    pub sex: i32,

    /// Education level (1 = graduate, 2 = university, 3 = high school, 4 = others)
    #[serde(rename = "EDUCATION")]
    pub education: i32,

    /// Marital status (1 = married, 2 = single, 3 = others)
    #[serde(rename = "MARRIAGE")]
    pub marriage: i32,

    /// Age in years
    #[serde(rename = "AGE")]
    pub age: i32,

    /// Repayment status in September (-1 = pay duly, 1 = one month delay, ...)
    #[serde(rename = "PAY_0")]
    pub pay_0: i32,

    #[serde(rename = "PAY_2")]
    pub pay_2: i32,

    #[serde(rename = "PAY_3")]
    pub pay_3: i32,

    #[serde(rename = "PAY_4")]
    pub pay_4: i32,

    #[serde(rename = "PAY_5")]
    pub pay_5: i32,

    #[serde(rename = "PAY_6")]
    pub pay_6: i32,

    /// Bill statement amounts, most recent first
    #[serde(rename = "BILL_AMT1")]
    pub bill_amt1: f64,

    #[serde(rename = "BILL_AMT2")]
    pub bill_amt2: f64,

    #[serde(rename = "BILL_AMT3")]
    pub bill_amt3: f64,

    #[serde(rename = "BILL_AMT4")]
    pub bill_amt4: f64,

    #[serde(rename = "BILL_AMT5")]
    pub bill_amt5: f64,

    #[serde(rename = "BILL_AMT6")]
    pub bill_amt6: f64,

    /// Previous payment amounts, most recent first
    #[serde(rename = "PAY_AMT1")]
    pub pay_amt1: f64,

    #[serde(rename = "PAY_AMT2")]
    pub pay_amt2: f64,

    #[serde(rename = "PAY_AMT3")]
    pub pay_amt3: f64,

    #[serde(rename = "PAY_AMT4")]
    pub pay_amt4: f64,

    #[serde(rename = "PAY_AMT5")]
    pub pay_amt5: f64,

    #[serde(rename = "PAY_AMT6")]
    pub pay_amt6: f64,
}

impl CreditApplication {
    /// Create an application with neutral history for the given limit and age
    pub fn new(limit_bal: f64, age: i32) -> Self {
        Self {
            limit_bal,
            sex: 1,
            education: 1,
            marriage: 1,
            age,
            pay_0: 0,
            pay_2: 0,
            pay_3: 0,
            pay_4: 0,
            pay_5: 0,
            pay_6: 0,
            bill_amt1: 0.0,
            bill_amt2: 0.0,
            bill_amt3: 0.0,
            bill_amt4: 0.0,
            bill_amt5: 0.0,
            bill_amt6: 0.0,
            pay_amt1: 0.0,
            pay_amt2: 0.0,
            pay_amt3: 0.0,
            pay_amt4: 0.0,
            pay_amt5: 0.0,
            pay_amt6: 0.0,
        }
    }

    /// Values in `PREDICTOR_COLUMNS` order
    pub fn values(&self) -> [f64; 23] {
        [
            self.limit_bal,
            self.sex as f64,
            self.education as f64,
            self.marriage as f64,
            self.age as f64,
            self.pay_0 as f64,
            self.pay_2 as f64,
            self.pay_3 as f64,
            self.pay_4 as f64,
            self.pay_5 as f64,
            self.pay_6 as f64,
            self.bill_amt1,
            self.bill_amt2,
            self.bill_amt3,
            self.bill_amt4,
            self.bill_amt5,
            self.bill_amt6,
            self.pay_amt1,
            self.pay_amt2,
            self.pay_amt3,
            self.pay_amt4,
            self.pay_amt5,
            self.pay_amt6,
        ]
    }

    /// Build a table with one row per application
    pub fn to_table(applications: &[CreditApplication]) -> Table {
        let columns = PREDICTOR_COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows = applications.iter().map(|a| a.values().to_vec()).collect();
        Table::new(columns, rows)
    }

    /// Read one row of a dataset table back into an application.
    ///
    /// Integer fields must hold whole numbers; missing cells are rejected.
    pub fn from_table_row(table: &Table, row: usize) -> Result<Self, DataError> {
        let float = |name: &str| -> Result<f64, DataError> {
            let value = table.value(row, name)?;
            if value.is_nan() {
                return Err(DataError::MissingValue {
                    column: name.to_string(),
                    row,
                });
            }
            Ok(value)
        };
        let int = |name: &str| -> Result<i32, DataError> {
            let value = float(name)?;
            if value.fract() != 0.0 {
                return Err(DataError::InvalidValue {
                    column: name.to_string(),
                    row,
                    value: value.to_string(),
                });
            }
            Ok(value as i32)
        };

        Ok(Self {
            limit_bal: float("LIMIT_BAL")?,
            sex: int("SEX")?,
            education: int("EDUCATION")?,
            marriage: int("MARRIAGE")?,
            age: int("AGE")?,
            pay_0: int("PAY_0")?,
            pay_2: int("PAY_2")?,
            pay_3: int("PAY_3")?,
            pay_4: int("PAY_4")?,
            pay_5: int("PAY_5")?,
            pay_6: int("PAY_6")?,
            bill_amt1: float("BILL_AMT1")?,
            bill_amt2: float("BILL_AMT2")?,
            bill_amt3: float("BILL_AMT3")?,
            bill_amt4: float("BILL_AMT4")?,
            bill_amt5: float("BILL_AMT5")?,
            bill_amt6: float("BILL_AMT6")?,
            pay_amt1: float("PAY_AMT1")?,
            pay_amt2: float("PAY_AMT2")?,
            pay_amt3: float("PAY_AMT3")?,
            pay_amt4: float("PAY_AMT4")?,
            pay_amt5: float("PAY_AMT5")?,
            pay_amt6: float("PAY_AMT6")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_uses_dataset_field_names() {
        let app = CreditApplication::new(50000.0, 30);

        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["LIMIT_BAL"], 50000.0);
        assert_eq!(json["AGE"], 30);
        assert_eq!(json.as_object().unwrap().len(), PREDICTOR_COLUMNS.len());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mut json = serde_json::to_value(CreditApplication::new(1.0, 40)).unwrap();
        json.as_object_mut().unwrap().remove("PAY_6");

        assert!(serde_json::from_value::<CreditApplication>(json).is_err());
    }

    #[test]
    fn test_table_row_roundtrip() {
        let mut app = CreditApplication::new(120000.0, 44);
        app.pay_0 = 2;
        app.bill_amt3 = 1530.5;

        let table = CreditApplication::to_table(&[app.clone()]);
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.value(0, "PAY_0").unwrap(), 2.0);

        let back = CreditApplication::from_table_row(&table, 0).unwrap();
        assert_eq!(back, app);
    }

    #[test]
    fn test_fractional_integer_field_is_rejected() {
        let mut table = CreditApplication::to_table(&[CreditApplication::new(1000.0, 30)]);
        table.set_value(0, "SEX", 1.5).unwrap();

        assert!(CreditApplication::from_table_row(&table, 0).is_err());
    }
}

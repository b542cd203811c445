//! Dataset loading, cleaning, splitting and validation

pub mod dataset;
pub mod table;
pub mod validation;

pub use dataset::{build_dataset, clean_data, load_data, save_data, train_test_split, DatasetSplit};
pub use table::Table;
pub use validation::{Expectation, ExpectationSuite, ValidationReport};

use thiserror::Error;

/// Errors raised while reading or reshaping tabular data
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Cannot parse value {value:?} in column {column} at row {row}")]
    ParseValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Missing value in column {column} at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Invalid value {value} in column {column} at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Row {row} out of bounds for table with {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },

    #[error("Length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Invalid split: {0}")]
    InvalidSplit(String),
}

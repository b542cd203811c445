//! Column-named numeric table backed by CSV files
//!
//! Every cell is an `f64`; missing values are `NaN` in memory and empty
//! cells on disk.

use super::DataError;
use csv::{ReaderBuilder, Trim, Writer};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Row-major numeric table with ordered, unique column names
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Table {
    /// Create a table. Every row must have one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, DataError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }

    /// Value at `row` of column `name`
    pub fn value(&self, row: usize, name: &str) -> Result<f64, DataError> {
        let col = self.column_index(name)?;
        self.rows
            .get(row)
            .map(|r| r[col])
            .ok_or(DataError::RowOutOfBounds {
                row,
                rows: self.rows.len(),
            })
    }

    pub fn set_value(&mut self, row: usize, name: &str, value: f64) -> Result<(), DataError> {
        let col = self.column_index(name)?;
        let rows = self.rows.len();
        let target = self
            .rows
            .get_mut(row)
            .ok_or(DataError::RowOutOfBounds { row, rows })?;
        target[col] = value;
        Ok(())
    }

    /// Copy of one column
    pub fn column(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let col = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[col]).collect())
    }

    /// Append a column, or overwrite it when the name already exists
    pub fn add_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), DataError> {
        if values.len() != self.rows.len() {
            return Err(DataError::LengthMismatch {
                expected: self.rows.len(),
                got: values.len(),
            });
        }

        match self.columns.iter().position(|c| c == name) {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<(), DataError> {
        let col = self.column_index(name)?;
        self.columns.remove(col);
        for row in &mut self.rows {
            row.remove(col);
        }
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), DataError> {
        let col = self.column_index(from)?;
        if from != to && self.has_column(to) {
            return Err(DataError::DuplicateColumn(to.to_string()));
        }
        self.columns[col] = to.to_string();
        Ok(())
    }

    /// Remove a column and return its values, e.g. to split off a target
    pub fn take_column(&mut self, name: &str) -> Result<Vec<f64>, DataError> {
        let values = self.column(name)?;
        self.drop_column(name)?;
        Ok(values)
    }

    /// New table with the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Keep only rows for which `keep` returns true
    pub fn retain_rows<F: FnMut(&[f64]) -> bool>(&mut self, mut keep: F) {
        self.rows.retain(|r| keep(r));
    }

    /// Read a CSV file with a header row
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut seen = std::collections::HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(DataError::DuplicateColumn(column.clone()));
            }
        }

        let mut rows = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let mut values = Vec::with_capacity(columns.len());
            for (col, cell) in record.iter().enumerate() {
                values.push(parse_cell(cell).ok_or_else(|| DataError::ParseValue {
                    column: columns[col].clone(),
                    row,
                    value: cell.to_string(),
                })?);
            }
            rows.push(values);
        }

        Ok(Self { columns, rows })
    }

    /// Write the table as CSV with a header and no index column
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), DataError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DataError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let file = File::create(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.to_writer(file)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), DataError> {
        let mut writer = Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|v| format_cell(*v)))?;
        }
        writer.flush().map_err(|source| DataError::Io {
            path: "<writer>".to_string(),
            source,
        })?;
        Ok(())
    }
}

fn parse_cell(cell: &str) -> Option<f64> {
    match cell {
        "" | "NA" | "NaN" | "nan" | "null" => Some(f64::NAN),
        _ => cell.parse::<f64>().ok(),
    }
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

//! Dataset builder: raw CSV to deduplicated, stratified train/test splits

use super::{DataError, Table};
use crate::config::{AppConfig, DataConfig};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Train and test partitions of a cleaned dataset
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Table,
    pub test: Table,
}

/// Load the raw dataset, dropping the identifier and renaming the target.
pub fn load_data<P: AsRef<Path>>(path: P, config: &DataConfig, target: &str) -> Result<Table> {
    let path = path.as_ref();
    let mut table = Table::read_csv(path)
        .with_context(|| format!("Failed to read raw dataset from {}", path.display()))?;

    table
        .drop_column(&config.id_column)
        .context("Raw dataset has no identifier column")?;
    table
        .rename_column(&config.raw_target_column, target)
        .context("Raw dataset has no target column")?;

    info!(
        path = %path.display(),
        rows = table.n_rows(),
        columns = table.n_cols(),
        "Raw dataset loaded"
    );
    Ok(table)
}

/// Drop exact duplicate rows, keeping first occurrences in order.
pub fn clean_data(mut table: Table) -> Table {
    let before = table.n_rows();
    let mut seen: HashSet<Vec<u64>> = HashSet::with_capacity(before);

    table.retain_rows(|row| seen.insert(row_key(row)));

    let removed = before - table.n_rows();
    if removed > 0 {
        info!(removed = removed, remaining = table.n_rows(), "Duplicate rows dropped");
    } else {
        debug!("No duplicate rows found");
    }
    table
}

/// Bit-level row identity where every NaN compares equal and -0.0 equals 0.0.
fn row_key(row: &[f64]) -> Vec<u64> {
    row.iter()
        .map(|v| {
            if v.is_nan() {
                f64::NAN.to_bits()
            } else if *v == 0.0 {
                0.0f64.to_bits()
            } else {
                v.to_bits()
            }
        })
        .collect()
}

/// Split into train/test, stratified on `stratify_column`.
///
/// Each class sends `round(n_class * test_size)` shuffled rows to the test
/// side. The same seed always produces the same split.
pub fn train_test_split(
    table: &Table,
    test_size: f64,
    random_state: u64,
    stratify_column: &str,
) -> Result<DatasetSplit, DataError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(DataError::InvalidSplit(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }

    let labels = table.column(stratify_column)?;
    let mut by_class: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        if label.is_nan() {
            return Err(DataError::MissingValue {
                column: stratify_column.to_string(),
                row: i,
            });
        }
        by_class.entry(label.to_bits()).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(random_state);
    let mut train_idx = Vec::new();
    let mut test_idx = Vec::new();

    for indices in by_class.values_mut() {
        indices.shuffle(&mut rng);
        let n_test = (indices.len() as f64 * test_size).round() as usize;
        test_idx.extend_from_slice(&indices[..n_test]);
        train_idx.extend_from_slice(&indices[n_test..]);
    }

    if train_idx.is_empty() || test_idx.is_empty() {
        return Err(DataError::InvalidSplit(format!(
            "split of {} rows with test_size {} leaves an empty side",
            table.n_rows(),
            test_size
        )));
    }

    // Interleave classes so neither file is sorted by label.
    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    Ok(DatasetSplit {
        train: table.select_rows(&train_idx),
        test: table.select_rows(&test_idx),
    })
}

/// Write a table as CSV without an index column.
pub fn save_data<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    table
        .write_csv(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), rows = table.n_rows(), "Dataset saved");
    Ok(())
}

/// Load, clean, split and persist the dataset. Returns the written paths.
pub fn build_dataset(config: &AppConfig) -> Result<(PathBuf, PathBuf)> {
    let target = &config.features.target;
    let table = load_data(&config.data.raw_path, &config.data, target)?;
    let table = clean_data(table);

    let split = train_test_split(
        &table,
        config.data.test_size,
        config.data.random_state,
        target,
    )
    .context("Failed to split dataset")?;

    let train_path = config.data.train_path();
    let test_path = config.data.test_path();
    save_data(&split.train, &train_path)?;
    save_data(&split.test, &test_path)?;

    info!(
        train_rows = split.train.n_rows(),
        test_rows = split.test.n_rows(),
        "Dataset prepared and split into train/test"
    );
    Ok((train_path, test_path))
}

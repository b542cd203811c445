//! Hyperparameter values and grid expansion

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix used by grids that address the classifier step of the pipeline
const STEP_PREFIX: &str = "classifier__";

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(s) => s.parse().ok(),
        }
    }

    /// Non-negative whole number
    pub fn as_usize(&self) -> Option<usize> {
        self.as_f64()
            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as usize)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Number(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// Candidate values per hyperparameter name
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// One point of a grid: hyperparameter name to value
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Canonical parameter name: step prefix stripped, lower-cased.
pub fn normalize_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    lower
        .strip_prefix(STEP_PREFIX)
        .map(str::to_string)
        .unwrap_or(lower)
}

/// Cartesian product of the grid in deterministic (sorted key) order.
///
/// An empty grid yields a single empty parameter set, so the defaults are
/// still evaluated.
pub fn expand_grid(grid: &ParamGrid) -> Vec<ParamSet> {
    let mut candidates = vec![ParamSet::new()];
    for (name, values) in grid {
        let mut next = Vec::with_capacity(candidates.len() * values.len());
        for candidate in &candidates {
            for value in values {
                let mut extended = candidate.clone();
                extended.insert(name.clone(), value.clone());
                next.push(extended);
            }
        }
        candidates = next;
    }
    candidates
}

/// Render a parameter set as strings, e.g. for experiment tracking
pub fn to_string_map(params: &ParamSet) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_grid() {
        let mut grid = ParamGrid::new();
        grid.insert(
            "classifier__C".into(),
            vec![ParamValue::Number(0.1), ParamValue::Number(1.0)],
        );
        grid.insert(
            "classifier__penalty".into(),
            vec![ParamValue::Text("l2".into()), ParamValue::Text("none".into())],
        );
        grid.insert("classifier__max_iter".into(), vec![ParamValue::Number(100.0)]);

        let sets = expand_grid(&grid);
        assert_eq!(sets.len(), 4);
        assert_eq!(sets[0]["classifier__C"], ParamValue::Number(0.1));
        assert_eq!(sets[0]["classifier__penalty"], ParamValue::Text("l2".into()));
        assert_eq!(sets[1]["classifier__penalty"], ParamValue::Text("none".into()));
        assert_eq!(sets[3]["classifier__C"], ParamValue::Number(1.0));
    }

    #[test]
    fn test_empty_grid_has_one_candidate() {
        assert_eq!(expand_grid(&ParamGrid::new()), vec![ParamSet::new()]);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("classifier__C"), "c");
        assert_eq!(normalize_name("CLASSIFIER__max_depth"), "max_depth");
        assert_eq!(normalize_name("n_estimators"), "n_estimators");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(ParamValue::Number(3.0).as_usize(), Some(3));
        assert_eq!(ParamValue::Number(3.5).as_usize(), None);
        assert_eq!(ParamValue::Text("0.5".into()).as_f64(), Some(0.5));
        assert_eq!(ParamValue::Number(10.0).to_string(), "10");

        let parsed: Vec<ParamValue> = serde_json::from_str(r#"[1, 0.5, "l2"]"#).unwrap();
        assert_eq!(parsed[0], ParamValue::Number(1.0));
        assert_eq!(parsed[2], ParamValue::Text("l2".into()));
    }
}

//! Gradient boosted regression trees for binary classification
//!
//! Each round fits a depth-limited regression tree to the log-loss
//! residuals `y - p` and sets leaf values with a single Newton step
//! (`Σ residual / Σ p(1 - p)`). Trees are grown level by level over
//! feature orderings sorted once per fit.

use super::params::{normalize_name, ParamSet};
use super::ModelError;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

const MIN_GAIN: f64 = 1e-12;

/// A node of a fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regression tree stored as a flat node list; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Residual statistics of a node being grown
#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    sum_residual: f64,
    sum_hessian: f64,
    count: usize,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Running left-side totals while scanning one feature for one node
#[derive(Debug, Clone, Copy, Default)]
struct ScanState {
    sum: f64,
    count: usize,
    last_value: Option<f64>,
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    sorted: &'a [Vec<usize>],
    max_depth: usize,
    min_samples_leaf: usize,
}

impl TreeBuilder<'_> {
    fn fit(&self, residuals: &[f64], hessians: &[f64]) -> RegressionTree {
        let n = residuals.len();
        let mut nodes = vec![TreeNode::Leaf { value: 0.0 }];
        let mut stats = vec![NodeStats {
            sum_residual: residuals.iter().sum(),
            sum_hessian: hessians.iter().sum(),
            count: n,
        }];
        // Node each sample currently falls into
        let mut node_of = vec![0usize; n];
        let mut open = vec![0usize];

        for _ in 0..self.max_depth {
            if open.is_empty() {
                break;
            }
            let best = self.best_splits(&open, &stats, &node_of, residuals);

            let mut next_open = Vec::new();
            // Child slots per split node: (left, right)
            let mut children = vec![None; nodes.len()];
            for (slot, node) in open.iter().enumerate() {
                if let Some(split) = best[slot] {
                    let left = nodes.len();
                    nodes.push(TreeNode::Leaf { value: 0.0 });
                    stats.push(NodeStats::default());
                    let right = nodes.len();
                    nodes.push(TreeNode::Leaf { value: 0.0 });
                    stats.push(NodeStats::default());

                    nodes[*node] = TreeNode::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };
                    children[*node] = Some((left, right, split));
                    next_open.push(left);
                    next_open.push(right);
                }
            }

            for i in 0..n {
                if let Some(Some((left, right, split))) = children.get(node_of[i]) {
                    let child = if self.x[[i, split.feature]] <= split.threshold {
                        *left
                    } else {
                        *right
                    };
                    node_of[i] = child;
                    let s = &mut stats[child];
                    s.sum_residual += residuals[i];
                    s.sum_hessian += hessians[i];
                    s.count += 1;
                }
            }
            open = next_open;
        }

        for (node, s) in nodes.iter_mut().zip(&stats) {
            if let TreeNode::Leaf { value } = node {
                *value = if s.sum_hessian > MIN_GAIN {
                    s.sum_residual / s.sum_hessian
                } else {
                    0.0
                };
            }
        }

        RegressionTree { nodes }
    }

    /// Best squared-error split for every open node, scanning each feature once.
    fn best_splits(
        &self,
        open: &[usize],
        stats: &[NodeStats],
        node_of: &[usize],
        residuals: &[f64],
    ) -> Vec<Option<SplitCandidate>> {
        let mut slot_of = vec![None; stats.len()];
        for (slot, node) in open.iter().enumerate() {
            slot_of[*node] = Some(slot);
        }

        let mut best: Vec<Option<SplitCandidate>> = vec![None; open.len()];
        for (feature, order) in self.sorted.iter().enumerate() {
            let mut scan = vec![ScanState::default(); open.len()];
            for &i in order {
                let Some(slot) = slot_of[node_of[i]] else {
                    continue;
                };
                let value = self.x[[i, feature]];
                let state = &mut scan[slot];

                if let Some(last) = state.last_value {
                    if value > last {
                        let total = stats[open[slot]];
                        let left_n = state.count;
                        let right_n = total.count - left_n;
                        if left_n >= self.min_samples_leaf && right_n >= self.min_samples_leaf {
                            let right_sum = total.sum_residual - state.sum;
                            let gain = state.sum * state.sum / left_n as f64
                                + right_sum * right_sum / right_n as f64
                                - total.sum_residual * total.sum_residual / total.count as f64;
                            let improves = best[slot].map_or(true, |b| gain > b.gain);
                            if gain > MIN_GAIN && improves {
                                best[slot] = Some(SplitCandidate {
                                    feature,
                                    threshold: (last + value) / 2.0,
                                    gain,
                                });
                            }
                        }
                    }
                }

                state.sum += residuals[i];
                state.count += 1;
                state.last_value = Some(value);
            }
        }
        best
    }
}

/// Log-loss gradient boosting classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Log-odds of the training prior
    pub init_score: Option<f64>,
    /// Width of the training matrix
    pub n_features: Option<usize>,
    pub trees: Vec<RegressionTree>,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            init_score: None,
            n_features: None,
            trees: Vec::new(),
        }
    }
}

impl GradientBoostingClassifier {
    pub fn from_params(params: &ParamSet) -> Result<Self, ModelError> {
        let mut model = Self::default();
        for (name, value) in params {
            let invalid = || ModelError::InvalidParameter {
                name: name.clone(),
                value: value.to_string(),
            };
            match normalize_name(name).as_str() {
                "n_estimators" => model.n_estimators = value.as_usize().filter(|n| *n > 0).ok_or_else(invalid)?,
                "learning_rate" => {
                    model.learning_rate = value.as_f64().filter(|v| *v > 0.0).ok_or_else(invalid)?
                }
                "max_depth" => model.max_depth = value.as_usize().filter(|n| *n > 0).ok_or_else(invalid)?,
                "min_samples_leaf" => {
                    model.min_samples_leaf = value.as_usize().filter(|n| *n > 0).ok_or_else(invalid)?
                }
                _ => return Err(ModelError::UnknownParameter(name.clone())),
            }
        }
        Ok(model)
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        if x.nrows() != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.nrows(),
                got: y.len(),
            });
        }
        if x.nrows() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }

        let n = x.nrows();
        let prior = (y.sum() / n as f64).clamp(1e-6, 1.0 - 1e-6);
        let init = (prior / (1.0 - prior)).ln();

        let sorted: Vec<Vec<usize>> = (0..x.ncols())
            .map(|f| {
                let mut order: Vec<usize> = (0..n).collect();
                order.sort_by(|&a, &b| x[[a, f]].total_cmp(&x[[b, f]]));
                order
            })
            .collect();
        let builder = TreeBuilder {
            x,
            sorted: &sorted,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
        };

        let mut raw = vec![init; n];
        let mut trees = Vec::with_capacity(self.n_estimators);
        for round in 0..self.n_estimators {
            let mut residuals = Vec::with_capacity(n);
            let mut hessians = Vec::with_capacity(n);
            for (i, score) in raw.iter().enumerate() {
                let p = Self::sigmoid(*score);
                residuals.push(y[i] - p);
                hessians.push(p * (1.0 - p));
            }

            let tree = builder.fit(&residuals, &hessians);
            for (i, score) in raw.iter_mut().enumerate() {
                *score += self.learning_rate * tree.predict_row(x.row(i));
            }
            trees.push(tree);

            if (round + 1) % 25 == 0 {
                debug!(round = round + 1, "Boosting progress");
            }
        }

        self.init_score = Some(init);
        self.n_features = Some(x.ncols());
        self.trees = trees;
        Ok(())
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let init = self.init_score.ok_or(ModelError::NotFitted)?;
        let n_features = self.n_features.ok_or(ModelError::NotFitted)?;
        if x.ncols() != n_features {
            return Err(ModelError::DimensionMismatch {
                expected: n_features,
                got: x.ncols(),
            });
        }

        let scores = x
            .rows()
            .into_iter()
            .map(|row| {
                let boost: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
                Self::sigmoid(init + self.learning_rate * boost)
            })
            .collect::<Vec<_>>();
        Ok(Array1::from_vec(scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::params::ParamValue;

    /// Positive class iff both features exceed 0.5 (not linearly trivial)
    fn and_data() -> (Array2<f64>, Array1<f64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                let a = i as f64 / 10.0;
                let b = j as f64 / 10.0;
                x.push(a);
                x.push(b);
                y.push(if a > 0.5 && b > 0.5 { 1.0 } else { 0.0 });
            }
        }
        (Array2::from_shape_vec((100, 2), x).unwrap(), Array1::from_vec(y))
    }

    #[test]
    fn test_fit_learns_interaction() {
        let (x, y) = and_data();
        let mut model = GradientBoostingClassifier {
            n_estimators: 50,
            learning_rate: 0.3,
            max_depth: 2,
            ..Default::default()
        };
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        let correct = proba
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (**p > 0.5) == (**t == 1.0))
            .count();
        assert_eq!(correct, 100);
        assert_eq!(model.trees.len(), 50);
        assert!(model.trees.iter().all(|t| t.depth() <= 2));
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let (x, y) = and_data();
        let mut model = GradientBoostingClassifier {
            n_estimators: 5,
            ..Default::default()
        };
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_features, Some(2));

        let narrow = Array2::zeros((3, 1));
        assert!(matches!(
            model.predict_proba(&narrow),
            Err(ModelError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = GradientBoostingClassifier::default();
        assert!(matches!(model.predict_proba(&Array2::zeros((1, 2))), Err(ModelError::NotFitted)));
    }

    #[test]
    fn test_constant_labels_predict_prior() {
        let (x, _) = and_data();
        let y = Array1::zeros(100);
        let mut model = GradientBoostingClassifier {
            n_estimators: 5,
            ..Default::default()
        };
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| *p < 0.01));
        // no residual structure, so every tree is a single leaf
        assert!(model.trees.iter().all(|t| t.nodes.len() == 1));
    }

    #[test]
    fn test_min_samples_leaf_limits_splits() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let y = Array1::from_vec(vec![0.0, 1.0, 1.0, 1.0]);
        let mut model = GradientBoostingClassifier {
            n_estimators: 1,
            max_depth: 1,
            min_samples_leaf: 2,
            ..Default::default()
        };
        model.fit(&x, &y).unwrap();

        match &model.trees[0].nodes[0] {
            TreeNode::Split { threshold, .. } => assert_eq!(*threshold, 1.5),
            other => panic!("expected a split, got {other:?}"),
        }
    }

    #[test]
    fn test_unfitted_and_params() {
        let (x, _) = and_data();
        assert!(matches!(
            GradientBoostingClassifier::default().predict_proba(&x),
            Err(ModelError::NotFitted)
        ));

        let mut params = ParamSet::new();
        params.insert("classifier__n_estimators".into(), ParamValue::Number(10.0));
        params.insert("classifier__max_depth".into(), ParamValue::Number(4.0));
        let model = GradientBoostingClassifier::from_params(&params).unwrap();
        assert_eq!((model.n_estimators, model.max_depth), (10, 4));

        let mut bad = ParamSet::new();
        bad.insert("classifier__max_depth".into(), ParamValue::Number(0.0));
        assert!(GradientBoostingClassifier::from_params(&bad).is_err());
    }
}

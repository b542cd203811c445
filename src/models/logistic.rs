//! Logistic regression for default probability estimation
//!
//! Batch gradient descent on the log loss with an optional L2 penalty. The
//! penalty is parameterised like the usual `C` (inverse regularization
//! strength): the objective is `mean(log_loss) + ||w||² / (2 · C · n)`.

use super::params::{normalize_name, ParamSet};
use super::ModelError;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Penalty applied to the coefficients (never to the intercept)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L2,
    None,
}

/// Binary logistic regression classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularization strength
    pub c: f64,
    pub penalty: Penalty,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Stop when the loss improves by less than this
    pub tol: f64,
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Iterations run by the last fit
    pub n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            penalty: Penalty::L2,
            max_iter: 1000,
            learning_rate: 0.1,
            tol: 1e-6,
            coefficients: None,
            intercept: None,
            n_iter: 0,
        }
    }
}

impl LogisticRegression {
    /// Build an unfitted model from grid parameters.
    pub fn from_params(params: &ParamSet) -> Result<Self, ModelError> {
        let mut model = Self::default();
        for (name, value) in params {
            let invalid = || ModelError::InvalidParameter {
                name: name.clone(),
                value: value.to_string(),
            };
            match normalize_name(name).as_str() {
                "c" => model.c = value.as_f64().filter(|c| *c > 0.0).ok_or_else(invalid)?,
                "max_iter" => model.max_iter = value.as_usize().filter(|n| *n > 0).ok_or_else(invalid)?,
                "learning_rate" => {
                    model.learning_rate = value.as_f64().filter(|v| *v > 0.0).ok_or_else(invalid)?
                }
                "tol" => model.tol = value.as_f64().filter(|v| *v >= 0.0).ok_or_else(invalid)?,
                "penalty" => {
                    model.penalty = match value.as_str() {
                        Some("l2") => Penalty::L2,
                        Some("none") => Penalty::None,
                        _ => return Err(invalid()),
                    }
                }
                _ => return Err(ModelError::UnknownParameter(name.clone())),
            }
        }
        Ok(model)
    }

    fn sigmoid(z: f64) -> f64 {
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let exp_z = z.exp();
            exp_z / (1.0 + exp_z)
        }
    }

    fn log_loss(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let eps = 1e-15;
        let n = y_true.len() as f64;

        -y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&y, &p)| {
                let p = p.clamp(eps, 1.0 - eps);
                y * p.ln() + (1.0 - y) * (1.0 - p).ln()
            })
            .sum::<f64>()
            / n
    }

    /// Fit on a design matrix and 0/1 labels.
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

        let n = x.nrows() as f64;
        let alpha = match self.penalty {
            Penalty::L2 => 1.0 / (self.c * n),
            Penalty::None => 0.0,
        };

        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        let mut previous_cost = f64::INFINITY;
        self.n_iter = 0;

        for iter in 0..self.max_iter {
            let predictions = (x.dot(&weights) + bias).mapv(Self::sigmoid);

            let errors = &predictions - y;
            let dw = x.t().dot(&errors) / n + &weights * alpha;
            let db = errors.sum() / n;

            let cost = Self::log_loss(y, &predictions) + 0.5 * alpha * weights.dot(&weights);

            weights = weights - dw * self.learning_rate;
            bias -= self.learning_rate * db;
            self.n_iter = iter + 1;

            if (previous_cost - cost).abs() < self.tol {
                debug!(iterations = self.n_iter, cost = cost, "Logistic regression converged");
                break;
            }
            previous_cost = cost;
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        Ok(())
    }

    /// Probability of the positive class per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let weights = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        let bias = self.intercept.ok_or(ModelError::NotFitted)?;
        if x.ncols() != weights.len() {
            return Err(ModelError::DimensionMismatch {
                expected: weights.len(),
                got: x.ncols(),
            });
        }

        Ok((x.dot(weights) + bias).mapv(Self::sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::params::ParamValue;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (6, 2),
            vec![-2.0, -1.5, -1.5, -1.0, -1.0, -2.0, 1.0, 1.5, 1.5, 2.0, 2.0, 1.0],
        )
        .unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        (x, y)
    }

    #[test]
    fn test_sigmoid() {
        assert!((LogisticRegression::sigmoid(0.0) - 0.5).abs() < 1e-10);
        assert!(LogisticRegression::sigmoid(100.0) > 0.99);
        assert!(LogisticRegression::sigmoid(-100.0) < 0.01);
    }

    #[test]
    fn test_fit_separates_classes() {
        let (x, y) = separable();
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        for (p, label) in proba.iter().zip(y.iter()) {
            if *label == 1.0 {
                assert!(*p > 0.5);
            } else {
                assert!(*p < 0.5);
            }
        }
    }

    #[test]
    fn test_stronger_regularization_shrinks_coefficients() {
        let (x, y) = separable();

        let mut weak = LogisticRegression { c: 100.0, ..Default::default() };
        weak.fit(&x, &y).unwrap();
        let mut strong = LogisticRegression { c: 0.01, ..Default::default() };
        strong.fit(&x, &y).unwrap();

        let norm = |m: &LogisticRegression| {
            m.coefficients.as_ref().unwrap().iter().map(|c| c * c).sum::<f64>().sqrt()
        };
        assert!(norm(&strong) < norm(&weak));
    }

    #[test]
    fn test_unfitted_model_errors() {
        let (x, _) = separable();
        assert!(matches!(
            LogisticRegression::default().predict_proba(&x),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn test_from_params() {
        let mut params = ParamSet::new();
        params.insert("classifier__C".into(), ParamValue::Number(0.5));
        params.insert("classifier__penalty".into(), ParamValue::Text("none".into()));
        params.insert("max_iter".into(), ParamValue::Number(50.0));

        let model = LogisticRegression::from_params(&params).unwrap();
        assert_eq!(model.c, 0.5);
        assert_eq!(model.penalty, Penalty::None);
        assert_eq!(model.max_iter, 50);

        let mut bad = ParamSet::new();
        bad.insert("classifier__C".into(), ParamValue::Number(-1.0));
        assert!(LogisticRegression::from_params(&bad).is_err());

        let mut unknown = ParamSet::new();
        unknown.insert("classifier__gamma".into(), ParamValue::Number(1.0));
        assert!(matches!(
            LogisticRegression::from_params(&unknown),
            Err(ModelError::UnknownParameter(_))
        ));
    }
}

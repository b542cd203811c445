//! Classification metrics for evaluating the default classifier

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confusion matrix for binary classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Count outcomes from 0/1 labels and 0/1 predictions
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t >= 0.5, p >= 0.5) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// TP / (TP + FP); 0 when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// TP / (TP + FN); 0 when there are no positives
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Predicted:    0       1\n\
             Actual 0:   {:>5}   {:>5}  (TN/FP)\n\
             Actual 1:   {:>5}   {:>5}  (FN/TP)",
            self.tn, self.fp, self.fn_, self.tp
        )
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Area under the ROC curve via the Mann-Whitney U statistic.
///
/// Tied scores receive their average rank. Returns NaN when only one class
/// is present.
pub fn roc_auc(y_true: &Array1<f64>, y_score: &Array1<f64>) -> f64 {
    let mut pairs: Vec<(f64, bool)> = y_score
        .iter()
        .zip(y_true.iter())
        .map(|(&s, &t)| (s, t >= 0.5))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n_pos = pairs.iter().filter(|(_, t)| *t).count();
    let n_neg = pairs.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < pairs.len() {
        let mut j = i;
        while j + 1 < pairs.len() && pairs[j + 1].0 == pairs[i].0 {
            j += 1;
        }
        // ranks are 1-based; ties share the mean of i+1..=j+1
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum_pos += pairs[i..=j].iter().filter(|(_, t)| *t).count() as f64 * avg_rank;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let u = rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0;
    u / (n_pos * n_neg as f64)
}

/// Mean binary cross-entropy with clipped probabilities
pub fn log_loss(y_true: &Array1<f64>, y_proba: &Array1<f64>) -> f64 {
    let eps = 1e-15;
    let n = y_true.len().max(1) as f64;
    -y_true
        .iter()
        .zip(y_proba.iter())
        .map(|(&y, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            y * p.ln() + (1.0 - y) * (1.0 - p).ln()
        })
        .sum::<f64>()
        / n
}

/// Hard labels: 1 where the probability is strictly above `threshold`
pub fn threshold_predictions(y_proba: &Array1<f64>, threshold: f64) -> Array1<f64> {
    y_proba.mapv(|p| if p > threshold { 1.0 } else { 0.0 })
}

/// Held-out evaluation of a fitted classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub roc_auc: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    pub log_loss: f64,
    pub threshold: f64,
    pub support: usize,
    pub confusion_matrix: ConfusionMatrix,
}

impl ClassificationReport {
    pub fn evaluate(y_true: &Array1<f64>, y_proba: &Array1<f64>, threshold: f64) -> Self {
        let y_pred = threshold_predictions(y_proba, threshold);
        let cm = ConfusionMatrix::from_predictions(y_true, &y_pred);

        Self {
            roc_auc: roc_auc(y_true, y_proba),
            precision: cm.precision(),
            recall: cm.recall(),
            f1: cm.f1(),
            accuracy: cm.accuracy(),
            log_loss: log_loss(y_true, y_proba),
            threshold,
            support: y_true.len(),
            confusion_matrix: cm,
        }
    }

    /// Metrics logged to experiment tracking, keyed `test_<metric>`
    pub fn tracked_metrics(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("test_roc_auc", self.roc_auc),
            ("test_precision", self.precision),
            ("test_recall", self.recall),
            ("test_f1", self.f1),
            ("test_accuracy", self.accuracy),
            ("test_log_loss", self.log_loss),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arr(v: &[f64]) -> Array1<f64> {
        Array1::from_vec(v.to_vec())
    }

    #[test]
    fn test_confusion_matrix() {
        let cm = ConfusionMatrix::from_predictions(
            &arr(&[1.0, 1.0, 0.0, 0.0, 1.0]),
            &arr(&[1.0, 0.0, 0.0, 1.0, 1.0]),
        );
        assert_eq!((cm.tp, cm.tn, cm.fp, cm.fn_), (2, 1, 1, 1));
        assert!((cm.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.accuracy() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_yields_zero() {
        let cm = ConfusionMatrix::from_predictions(&arr(&[1.0, 0.0]), &arr(&[0.0, 0.0]));
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.f1(), 0.0);
    }

    #[test]
    fn test_roc_auc() {
        let y = arr(&[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(roc_auc(&y, &arr(&[0.1, 0.4, 0.35, 0.8])), 0.75);
        assert_eq!(roc_auc(&y, &arr(&[0.1, 0.2, 0.8, 0.9])), 1.0);
        // all tied
        assert_eq!(roc_auc(&y, &arr(&[0.5, 0.5, 0.5, 0.5])), 0.5);
        assert!(roc_auc(&arr(&[1.0, 1.0]), &arr(&[0.2, 0.3])).is_nan());
    }

    #[test]
    fn test_threshold_is_strict() {
        let preds = threshold_predictions(&arr(&[0.5, 0.51, 0.2]), 0.5);
        assert_eq!(preds, arr(&[0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_report() {
        let y = arr(&[0.0, 0.0, 1.0, 1.0]);
        let report = ClassificationReport::evaluate(&y, &arr(&[0.1, 0.6, 0.7, 0.9]), 0.5);
        assert_eq!(report.support, 4);
        assert_eq!(report.roc_auc, 1.0);
        assert!((report.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.recall, 1.0);
        assert_eq!(report.tracked_metrics()[0].0, "test_roc_auc");
    }
}

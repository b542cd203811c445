//! Prediction response structures

use serde::{Deserialize, Serialize};

/// Risk band derived from the default probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Determine risk level from probability and thresholds
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Lower bounds of the medium, high and critical bands; anything below
/// `medium` is low risk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            medium: 0.5,
            high: 0.7,
            critical: 0.9,
        }
    }
}

/// Class label returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultClass {
    #[serde(rename = "non-default")]
    NonDefault,
    #[serde(rename = "default")]
    Default,
}

impl DefaultClass {
    /// Label a probability; only values strictly above the threshold default
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability > threshold {
            DefaultClass::Default
        } else {
            DefaultClass::NonDefault
        }
    }

    pub fn as_label(&self) -> u8 {
        match self {
            DefaultClass::NonDefault => 0,
            DefaultClass::Default => 1,
        }
    }
}

/// Response body of `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// 1 when the application is predicted to default
    pub prediction: u8,
    /// Probability of default (0.0 - 1.0)
    pub probability: f64,
    /// "default" or "non-default"
    pub class_name: DefaultClass,
    /// Risk band of the probability
    pub risk_level: RiskLevel,
}

impl PredictionResponse {
    pub fn new(probability: f64, threshold: f64, risk_thresholds: &RiskLevelThresholds) -> Self {
        let class = DefaultClass::from_probability(probability, threshold);
        Self {
            prediction: class.as_label(),
            probability,
            class_name: class,
            risk_level: RiskLevel::from_score(probability, risk_thresholds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_from_config_section() {
        let thresholds: RiskLevelThresholds =
            serde_json::from_str(r#"{"medium": 0.4, "high": 0.6, "critical": 0.8}"#).unwrap();
        assert_eq!(RiskLevel::from_score(0.39, &thresholds), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.4, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.8, &thresholds), RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_from_score() {
        let thresholds = RiskLevelThresholds::default();

        assert_eq!(RiskLevel::from_score(0.1, &thresholds), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.5, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.75, &thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.95, &thresholds), RiskLevel::Critical);
    }

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(DefaultClass::from_probability(0.5, 0.5), DefaultClass::NonDefault);
        assert_eq!(DefaultClass::from_probability(0.5001, 0.5), DefaultClass::Default);
    }

    #[test]
    fn test_response_serialization() {
        let response = PredictionResponse::new(0.82, 0.5, &RiskLevelThresholds::default());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["prediction"], 1);
        assert_eq!(json["class_name"], "default");
        assert_eq!(json["risk_level"], "high");

        let low = PredictionResponse::new(0.12, 0.5, &RiskLevelThresholds::default());
        let json = serde_json::to_value(&low).unwrap();
        assert_eq!(json["prediction"], 0);
        assert_eq!(json["class_name"], "non-default");
    }
}

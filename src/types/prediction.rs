//! Prediction output and risk tiering

use serde::{Deserialize, Serialize};

/// Churn probability at or above which a customer is high risk
pub const HIGH_RISK_THRESHOLD: f64 = 0.70;

/// Churn probability at or above which a customer is medium risk
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.40;

/// Risk tier derived from churn probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a churn probability using inclusive lower bounds
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if probability >= MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn recommended_action(&self) -> &'static str {
        match self {
            RiskLevel::High => "Immediate intervention required",
            RiskLevel::Medium => "Monitor and engage with retention offers",
            RiskLevel::Low => "Continue standard service",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

/// Classifier decision and probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnPrediction {
    pub will_churn: bool,
    /// Rounded to 4 decimal places
    pub churn_probability: f64,
    /// `1 - churn_probability`, rounded to 4 decimal places
    pub retention_probability: f64,
}

/// Risk tier with the matching retention action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub recommended_action: String,
}

/// Scoring result for one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub customer_id: String,
    pub prediction: ChurnPrediction,
    pub risk_assessment: RiskAssessment,
}

impl PredictionResult {
    /// Assemble a result from the raw classifier outputs.
    ///
    /// The tier is taken from the unrounded probability.
    pub fn new(customer_id: String, will_churn: bool, churn_probability: f64) -> Self {
        let risk_level = RiskLevel::from_probability(churn_probability);

        Self {
            customer_id,
            prediction: ChurnPrediction {
                will_churn,
                churn_probability: round4(churn_probability),
                retention_probability: round4(1.0 - churn_probability),
            },
            risk_assessment: RiskAssessment {
                risk_level,
                recommended_action: risk_level.recommended_action().to_string(),
            },
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_assessment.risk_level
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

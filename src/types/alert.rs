//! Churn alert published for high-risk customers

use crate::types::prediction::{PredictionResult, RiskLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert raised when a scored customer lands in the high-risk tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnAlert {
    /// Unique alert identifier
    pub alert_id: String,

    /// Scored customer
    pub customer_id: String,

    /// Rounded churn probability
    pub churn_probability: f64,

    pub risk_level: RiskLevel,

    pub recommended_action: String,

    /// Alert generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl ChurnAlert {
    /// Build an alert from a prediction, or `None` if it is not high risk
    pub fn from_prediction(result: &PredictionResult) -> Option<Self> {
        if result.risk_level() != RiskLevel::High {
            return None;
        }

        Some(Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            customer_id: result.customer_id.clone(),
            churn_probability: result.prediction.churn_probability,
            risk_level: result.risk_level(),
            recommended_action: result.risk_assessment.recommended_action.clone(),
            timestamp: Utc::now(),
        })
    }
}

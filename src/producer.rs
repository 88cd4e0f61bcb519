//! NATS publishing: request replies and churn alerts

use crate::error::{ErrorResponse, ScoringResult};
use crate::types::alert::ChurnAlert;
use crate::types::prediction::PredictionResult;
use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use tracing::debug;

/// Serialize a scoring outcome as the reply body: the prediction on
/// success, the structured error otherwise.
pub fn reply_payload(outcome: &ScoringResult<PredictionResult>) -> Result<Vec<u8>> {
    let payload = match outcome {
        Ok(result) => serde_json::to_vec(result)?,
        Err(e) => serde_json::to_vec(&ErrorResponse::from(e))?,
    };
    Ok(payload)
}

/// Publisher for replies and high-risk alerts
#[derive(Clone)]
pub struct AlertProducer {
    client: Client,
    subject: String,
}

impl AlertProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a churn alert
    pub async fn publish(&self, alert: &ChurnAlert) -> Result<()> {
        let payload = serde_json::to_vec(alert)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            alert_id = %alert.alert_id,
            customer_id = %alert.customer_id,
            churn_probability = alert.churn_probability,
            "Published churn alert"
        );

        Ok(())
    }

    /// Reply to a request with any serializable body
    pub async fn reply<T: Serialize>(&self, reply_to: Subject, body: &T) -> Result<()> {
        let payload = serde_json::to_vec(body)?;
        self.client.publish(reply_to, payload.into()).await?;
        Ok(())
    }

    /// Reply with pre-serialized bytes
    pub async fn reply_bytes(&self, reply_to: Subject, payload: Vec<u8>) -> Result<()> {
        self.client.publish(reply_to, payload.into()).await?;
        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoringError;

    #[test]
    fn test_reply_payload_success() {
        let outcome = Ok(PredictionResult::new("c1".to_string(), false, 0.12));
        let json: serde_json::Value =
            serde_json::from_slice(&reply_payload(&outcome).unwrap()).unwrap();

        assert_eq!(json["customer_id"], "c1");
        assert_eq!(json["risk_assessment"]["risk_level"], "Low");
    }

    #[test]
    fn test_reply_payload_error() {
        let outcome = Err(ScoringError::invalid_field("Partner", "Maybe"));
        let json: serde_json::Value =
            serde_json::from_slice(&reply_payload(&outcome).unwrap()).unwrap();

        assert_eq!(json["kind"], "invalid_field_value");
        assert_eq!(json["field"], "Partner");
    }
}

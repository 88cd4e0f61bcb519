//! NATS subscriptions for scoring and health requests

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for scoring and health request subjects
pub struct RequestConsumer {
    client: Client,
    score_subject: String,
    health_subject: String,
}

impl RequestConsumer {
    pub fn new(client: Client, score_subject: &str, health_subject: &str) -> Self {
        Self {
            client,
            score_subject: score_subject.to_string(),
            health_subject: health_subject.to_string(),
        }
    }

    /// Subscribe to the scoring subject
    pub async fn subscribe_scoring(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.score_subject.clone()).await?;
        info!(subject = %self.score_subject, "Subscribed to scoring subject");
        Ok(subscriber)
    }

    /// Subscribe to the health subject
    pub async fn subscribe_health(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.health_subject.clone()).await?;
        info!(subject = %self.health_subject, "Subscribed to health subject");
        Ok(subscriber)
    }

    pub fn score_subject(&self) -> &str {
        &self.score_subject
    }
}

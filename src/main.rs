//! Churn Risk Pipeline - Main Entry Point
//!
//! Loads the classifier and scaler once, then answers scoring requests over
//! NATS request/reply and publishes high-risk alerts.

use anyhow::Result;
use churn_risk_pipeline::{
    config::{AppConfig, LoggingConfig},
    consumer::RequestConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    models::loader::{load_classifier, load_or_degrade, load_scaler, load_schema},
    predictor::{Artifacts, ChurnPredictor},
    producer::{reply_payload, AlertProducer},
    types::ChurnAlert,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("churn_risk_pipeline={}", logging.level)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Churn Risk Pipeline");

    // The schema must load; a wrong layout would misalign every prediction
    let schema = load_schema(&config.models)?;
    info!(features = schema.len(), "Feature schema ready");

    // Missing classifier or scaler degrades the service instead of exiting
    let classifier = load_or_degrade("classifier", || load_classifier(&config.models, &schema));
    let scaler = load_or_degrade("scaler", || load_scaler(&config.models));

    let predictor = Arc::new(ChurnPredictor::new(Artifacts::new(schema, classifier, scaler))?);
    let health = predictor.health();
    if predictor.is_ready() {
        info!(health = ?health, "Predictor ready");
    } else {
        warn!(health = ?health, "Predictor degraded, all scoring requests will be refused");
    }

    let metrics = Arc::new(PipelineMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(
        client.clone(),
        &config.nats.score_subject,
        &config.nats.health_subject,
    );
    let producer = Arc::new(AlertProducer::new(client.clone(), &config.nats.alert_subject));
    info!("Publishing alerts to: {}", producer.subject());

    // Metrics reporter
    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    // Health probes
    let mut health_subscription = consumer.subscribe_health().await?;
    {
        let predictor = predictor.clone();
        let producer = producer.clone();
        tokio::spawn(async move {
            while let Some(message) = health_subscription.next().await {
                if let Some(reply_to) = message.reply {
                    if let Err(e) = producer.reply(reply_to, &predictor.health()).await {
                        warn!(error = %e, "Failed to answer health probe");
                    }
                }
            }
        });
    }

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        subject = consumer.score_subject(),
        "Starting scoring loop"
    );
    let semaphore = Arc::new(Semaphore::new(num_workers));

    let mut subscription = consumer.subscribe_scoring().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;

        let predictor = predictor.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let outcome = predictor.predict_json(&message.payload);
            let processing_time = start_time.elapsed();

            match &outcome {
                Ok(result) => {
                    metrics.record_prediction(
                        processing_time,
                        result.prediction.churn_probability,
                        result.risk_level(),
                    );
                    debug!(
                        customer_id = %result.customer_id,
                        churn_probability = result.prediction.churn_probability,
                        risk_level = result.risk_level().as_str(),
                        processing_time_us = processing_time.as_micros(),
                        "Request scored"
                    );

                    if let Some(alert) = ChurnAlert::from_prediction(result) {
                        if let Err(e) = producer.publish(&alert).await {
                            error!(
                                customer_id = %alert.customer_id,
                                error = %e,
                                "Failed to publish churn alert"
                            );
                        } else {
                            info!(
                                customer_id = %alert.customer_id,
                                churn_probability = alert.churn_probability,
                                "Churn alert published"
                            );
                        }
                    }
                }
                Err(e) => {
                    metrics.record_rejection(processing_time, e.kind());
                    warn!(kind = e.kind(), error = %e, "Scoring request rejected");
                }
            }

            match message.reply {
                Some(reply_to) => match reply_payload(&outcome) {
                    Ok(payload) => {
                        if let Err(e) = producer.reply_bytes(reply_to, payload).await {
                            error!(error = %e, "Failed to send scoring reply");
                        }
                    }
                    Err(e) => error!(error = %e, "Failed to serialize scoring reply"),
                },
                None => debug!("Scoring request without reply subject"),
            }

            drop(permit);
        });
    }

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}

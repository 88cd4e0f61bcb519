//! Configuration management for the churn scoring pipeline

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Model family of the classifier artifact
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// ONNX export of the trained model
    #[default]
    Onnx,
    /// Logistic regression coefficients as JSON
    Logistic,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming scoring requests
    pub score_subject: String,
    /// Subject answering health probes
    pub health_subject: String,
    /// Subject for outgoing high-risk alerts
    pub alert_subject: String,
}

/// Model artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    #[serde(default)]
    pub classifier_kind: ClassifierKind,
    /// Path to the classifier artifact
    pub classifier_path: String,
    /// Path to the scaler parameters
    pub scaler_path: String,
    /// Optional exported feature layout; the built-in layout is used otherwise
    #[serde(default)]
    pub schema_path: Option<String>,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum requests scored concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            metrics_interval_secs: default_metrics_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// `CHURN__SECTION__KEY` environment variables override file values.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("CHURN").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                score_subject: "churn.score".to_string(),
                health_subject: "churn.health".to_string(),
                alert_subject: "churn.alerts".to_string(),
            },
            models: ModelsConfig {
                classifier_kind: ClassifierKind::Onnx,
                classifier_path: "models/churn_model.onnx".to_string(),
                scaler_path: "models/scaler.json".to_string(),
                schema_path: None,
                onnx_threads: 1,
            },
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.models.classifier_kind, ClassifierKind::Onnx);
        assert_eq!(config.pipeline.workers, 4);
        assert!(config.models.schema_path.is_none());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[nats]
url = "nats://broker:4222"
score_subject = "s"
health_subject = "h"
alert_subject = "a"

[models]
classifier_kind = "logistic"
classifier_path = "m.json"
scaler_path = "s.json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.nats.url, "nats://broker:4222");
        assert_eq!(config.models.classifier_kind, ClassifierKind::Logistic);
        assert_eq!(config.models.onnx_threads, 1);
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.logging.format, "pretty");
    }
}

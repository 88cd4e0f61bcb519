//! Churn Risk Pipeline Library
//!
//! Rebuilds the feature row a trained churn classifier expects from a raw
//! customer record, scales it, scores it and maps the churn probability to
//! a retention risk tier.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_encoder;
pub mod metrics;
pub mod models;
pub mod predictor;
pub mod producer;
pub mod schema;
pub mod types;

pub use config::AppConfig;
pub use error::{ScoringError, ScoringResult};
pub use feature_encoder::FeatureEncoder;
pub use predictor::{Artifacts, ChurnPredictor};
pub use schema::FeatureSchema;
pub use types::{PredictionResult, RawCustomerRecord, RiskLevel};

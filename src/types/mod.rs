//! Type definitions for the churn scoring pipeline

pub mod alert;
pub mod customer;
pub mod features;
pub mod prediction;

pub use alert::ChurnAlert;
pub use customer::RawCustomerRecord;
pub use features::FeatureVector;
pub use prediction::{PredictionResult, RiskLevel};

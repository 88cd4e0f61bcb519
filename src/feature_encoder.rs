//! Feature encoding for churn model inference.
//!
//! Rebuilds the exact row the classifier was trained on from a loosely-typed
//! customer record: derives `total_services`, encodes the binary and
//! categorical attributes, and aligns everything to the schema registry.
//!
//! Two absence rules apply and are intentionally different:
//! - an absent service field counts as "not subscribed" when deriving
//!   `total_services`;
//! - any other absent field leaves its columns at the schema default of 0.

use crate::error::{ScoringError, ScoringResult};
use crate::schema::FeatureSchema;
use crate::types::customer::RawCustomerRecord;
use crate::types::features::FeatureVector;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Derived count of subscribed services
pub const TOTAL_SERVICES: &str = "total_services";

/// Value that marks a service as subscribed
pub const AFFIRMATIVE: &str = "Yes";

/// Fields counted into `total_services`
pub const SERVICE_FIELDS: [&str; 8] = [
    "PhoneService",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
];

/// Identifier, label and billing-total fields; never encoded
pub const DROPPED_FIELDS: [&str; 3] = ["customerID", "TotalCharges", "Churn"];

/// Two-valued fields mapped through the binary table
pub const BINARY_FIELDS: [&str; 5] = [
    "gender",
    "Partner",
    "Dependents",
    "PhoneService",
    "PaperlessBilling",
];

/// Numeric fields copied into the row as-is
pub const NUMERIC_FIELDS: [&str; 3] = ["SeniorCitizen", "tenure", "MonthlyCharges"];

/// Fields expanded into `{field}_{value}` indicator columns
pub const CATEGORICAL_FIELDS: [&str; 10] = [
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaymentMethod",
];

/// Binary table shared by every binary field
fn binary_code(value: &str) -> Option<f64> {
    match value {
        "Yes" | "Male" => Some(1.0),
        "No" | "Female" => Some(0.0),
        _ => None,
    }
}

/// Count of service fields holding the affirmative value
pub fn count_services(record: &RawCustomerRecord) -> usize {
    SERVICE_FIELDS
        .iter()
        .filter(|field| matches!(record.get(field), Some(Value::String(s)) if s == AFFIRMATIVE))
        .count()
}

/// Encodes customer records into schema-aligned feature vectors.
///
/// Holds no state besides the shared schema, so encoding the same record
/// always yields the same vector.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: Arc<FeatureSchema>,
}

impl FeatureEncoder {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    /// Encode one record.
    ///
    /// Every column starts at 0 and only columns named by the schema are
    /// written, so the output length and order always match the schema.
    /// Indicator columns for categories the schema does not know are never
    /// created. A present field whose value cannot be encoded rejects the
    /// whole record.
    pub fn encode(&self, record: &RawCustomerRecord) -> ScoringResult<FeatureVector> {
        let mut row = FeatureVector::zeros(&self.schema);

        let total_services = count_services(record);
        self.set(&mut row, TOTAL_SERVICES, total_services as f64);

        for field in BINARY_FIELDS {
            if let Some(value) = record.get(field) {
                let code = value
                    .as_str()
                    .and_then(binary_code)
                    .ok_or_else(|| ScoringError::invalid_field(field, value))?;
                self.set(&mut row, field, code);
            }
        }

        for field in NUMERIC_FIELDS {
            if let Some(value) = record.get(field) {
                let number = match value {
                    Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
                    other => other.as_f64().filter(|n| n.is_finite()),
                }
                .ok_or_else(|| ScoringError::invalid_field(field, value))?;
                self.set(&mut row, field, number);
            }
        }

        for field in CATEGORICAL_FIELDS {
            if let Some(value) = record.get(field) {
                let category = value
                    .as_str()
                    .ok_or_else(|| ScoringError::invalid_field(field, value))?;
                self.set(&mut row, &format!("{}_{}", field, category), 1.0);
            }
        }

        debug!(
            customer_id = %record.customer_id(),
            total_services = total_services,
            features = row.len(),
            "Record encoded"
        );

        Ok(row)
    }

    fn set(&self, row: &mut FeatureVector, column: &str, value: f64) {
        if let Some(index) = self.schema.index_of(column) {
            row.values_mut()[index] = value;
        }
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new(Arc::new(FeatureSchema::telco()))
    }
}

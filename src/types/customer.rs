//! Raw customer record as entered by a human or exported from billing

use crate::error::{ScoringError, ScoringResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field carrying the customer identifier
pub const CUSTOMER_ID_FIELD: &str = "customerID";

/// Identifier reported when the record carries none
pub const UNKNOWN_CUSTOMER: &str = "Unknown";

/// Loosely-typed customer record.
///
/// Any subset of the known fields may be present; unknown fields are carried
/// along and ignored by the encoder. A JSON `null` is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawCustomerRecord(Map<String, Value>);

impl RawCustomerRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Parse a record from a JSON payload.
    ///
    /// `null`, an empty body, or an empty object yield `EmptyInput`; any other
    /// non-object payload is rejected as an internal failure.
    pub fn from_json(payload: &[u8]) -> ScoringResult<Self> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Err(ScoringError::EmptyInput);
        }

        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| ScoringError::internal(format!("malformed JSON payload: {}", e)))?;

        match value {
            Value::Null => Err(ScoringError::EmptyInput),
            Value::Object(map) if map.is_empty() => Err(ScoringError::EmptyInput),
            Value::Object(map) => Ok(Self(map)),
            other => Err(ScoringError::internal(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Builder-style insert, mostly for tests and tooling
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Value of a field, with `null` folded into absence
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Customer identifier for reporting, or `"Unknown"`
    pub fn customer_id(&self) -> String {
        match self.get(CUSTOMER_ID_FIELD) {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => UNKNOWN_CUSTOMER.to_string(),
        }
    }
}

impl From<Map<String, Value>> for RawCustomerRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_id_fallback() {
        let record = RawCustomerRecord::new().with("tenure", 5);
        assert_eq!(record.customer_id(), "Unknown");

        let record = record.with(CUSTOMER_ID_FIELD, "9237-HQITU");
        assert_eq!(record.customer_id(), "9237-HQITU");
    }

    #[test]
    fn test_null_is_absent() {
        let record = RawCustomerRecord::from_json(br#"{"customerID": null, "tenure": 3}"#).unwrap();
        assert!(record.get(CUSTOMER_ID_FIELD).is_none());
        assert_eq!(record.customer_id(), "Unknown");
    }

    #[test]
    fn test_empty_payloads() {
        assert_eq!(RawCustomerRecord::from_json(b""), Err(ScoringError::EmptyInput));
        assert_eq!(RawCustomerRecord::from_json(b"null"), Err(ScoringError::EmptyInput));
        assert_eq!(RawCustomerRecord::from_json(b"{}"), Err(ScoringError::EmptyInput));
    }

    #[test]
    fn test_non_object_payload() {
        let err = RawCustomerRecord::from_json(b"[1, 2]").unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert!(err.to_string().contains("array"));
    }
}

//! Schema-aligned numeric feature row

use crate::error::{ScoringError, ScoringResult};
use crate::schema::FeatureSchema;

/// Numeric row in schema order, ready for scaling and inference
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Wrap values that are already in schema order.
    ///
    /// Fails when the length does not match the schema.
    pub fn from_values(schema: &FeatureSchema, values: Vec<f64>) -> ScoringResult<Self> {
        if values.len() != schema.len() {
            return Err(ScoringError::internal(format!(
                "feature vector has {} values, schema expects {}",
                values.len(),
                schema.len()
            )));
        }
        Ok(Self { values })
    }

    /// All-zero row for a schema
    pub(crate) fn zeros(schema: &FeatureSchema) -> Self {
        Self {
            values: vec![0.0; schema.len()],
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named column
    pub fn get(&self, schema: &FeatureSchema, name: &str) -> Option<f64> {
        schema.index_of(name).and_then(|i| self.values.get(i).copied())
    }

    /// Values narrowed to f32, the width ONNX exports take as input
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_checks_length() {
        let schema = FeatureSchema::telco();
        assert!(FeatureVector::from_values(&schema, vec![0.0; 3]).is_err());

        let vector = FeatureVector::from_values(&schema, vec![1.0; schema.len()]).unwrap();
        assert_eq!(vector.get(&schema, "tenure"), Some(1.0));
        assert_eq!(vector.get(&schema, "unknown"), None);
    }
}

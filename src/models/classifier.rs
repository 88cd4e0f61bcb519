//! Classifier capability and the linear model family

use crate::error::{ScoringError, ScoringResult};
use crate::schema::FeatureSchema;
use crate::types::features::FeatureVector;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Trained binary churn classifier.
///
/// Both operations take exactly one schema-aligned, scaled vector and are
/// pure: no caching, no feature engineering.
pub trait ChurnClassifier: Send + Sync {
    /// Model identifier for logs and health reporting
    fn name(&self) -> &str;

    /// Decision at the model's own threshold
    fn predict(&self, features: &FeatureVector) -> ScoringResult<bool>;

    /// `[p_negative, p_positive]`
    fn predict_probability(&self, features: &FeatureVector) -> ScoringResult<[f64; 2]>;

    /// Decision and probabilities for one vector.
    ///
    /// Backends that produce both from a single evaluation override this.
    fn classify(&self, features: &FeatureVector) -> ScoringResult<(bool, [f64; 2])> {
        Ok((self.predict(features)?, self.predict_probability(features)?))
    }
}

fn default_threshold() -> f64 {
    0.5
}

/// On-disk form of a logistic model
#[derive(Debug, Deserialize)]
struct LogisticFile {
    intercept: f64,
    coefficients: HashMap<String, f64>,
    #[serde(default = "default_threshold")]
    threshold: f64,
}

/// Logistic regression over the schema columns
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    intercept: f64,
    /// One weight per schema column, in schema order
    weights: Vec<f64>,
    threshold: f64,
}

impl LogisticClassifier {
    /// Build from weights keyed by feature name.
    ///
    /// Every schema column needs a weight; names the schema does not know
    /// are rejected so a model trained on another layout cannot load.
    pub fn new(
        schema: &FeatureSchema,
        intercept: f64,
        coefficients: &HashMap<String, f64>,
        threshold: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            bail!("Decision threshold {} outside [0, 1]", threshold);
        }
        if let Some(unknown) = coefficients.keys().find(|name| !schema.contains(name)) {
            bail!("Coefficient for unknown feature '{}'", unknown);
        }

        let weights = schema
            .names()
            .iter()
            .map(|name| {
                coefficients
                    .get(name)
                    .copied()
                    .with_context(|| format!("Missing coefficient for feature '{}'", name))
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(Self {
            intercept,
            weights,
            threshold,
        })
    }

    /// Load a JSON export: `{"intercept": .., "coefficients": {..}, "threshold": ..}`
    pub fn load<P: AsRef<Path>>(path: P, schema: &FeatureSchema) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read logistic model from {}", path.display()))?;
        let file: LogisticFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse logistic model {}", path.display()))?;

        let model = Self::new(schema, file.intercept, &file.coefficients, file.threshold)?;
        info!(
            path = %path.display(),
            features = model.weights.len(),
            threshold = model.threshold,
            "Logistic model loaded"
        );
        Ok(model)
    }

    fn positive_probability(&self, features: &FeatureVector) -> ScoringResult<f64> {
        if features.len() != self.weights.len() {
            return Err(ScoringError::internal(format!(
                "classifier expects {} features, got {}",
                self.weights.len(),
                features.len()
            )));
        }

        let logit: f64 = self.intercept
            + self
                .weights
                .iter()
                .zip(features.values())
                .map(|(w, x)| w * x)
                .sum::<f64>();

        Ok(1.0 / (1.0 + (-logit).exp()))
    }
}

impl ChurnClassifier for LogisticClassifier {
    fn name(&self) -> &str {
        "logistic"
    }

    fn predict(&self, features: &FeatureVector) -> ScoringResult<bool> {
        Ok(self.positive_probability(features)? >= self.threshold)
    }

    fn predict_probability(&self, features: &FeatureVector) -> ScoringResult<[f64; 2]> {
        let p = self.positive_probability(features)?;
        Ok([1.0 - p, p])
    }
}

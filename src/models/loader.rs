//! Artifact loading: ONNX sessions, scaler parameters, schema

use crate::config::{ClassifierKind, ModelsConfig};
use crate::models::classifier::{ChurnClassifier, LogisticClassifier};
use crate::models::inference::OnnxClassifier;
use crate::models::scaler::{AffineScaler, FeatureScaler};
use crate::schema::FeatureSchema;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Loaded ONNX session with resolved input/output names
pub struct LoadedModel {
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the feature tensor
    pub input_name: String,
    /// Output name for the predicted label
    pub label_name: String,
    /// Output name for class probabilities
    pub probability_name: String,
}

/// Loader for ONNX classifier exports
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input = session
            .inputs
            .first()
            .context("ONNX model declares no inputs")?;
        let input_name = input.name.clone();

        let label_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone())
            .context("ONNX model declares no label output")?;

        let probability_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.iter().find(|o| !o.name.contains("label")))
            .map(|o| o.name.clone())
            .context("ONNX model declares no probability output")?;

        info!(
            input = %input_name,
            label = %label_name,
            probabilities = %probability_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            session,
            input_name,
            label_name,
            probability_name,
        })
    }
}

/// Load the configured classifier
pub fn load_classifier(
    config: &ModelsConfig,
    schema: &FeatureSchema,
) -> Result<Arc<dyn ChurnClassifier>> {
    let classifier: Arc<dyn ChurnClassifier> = match config.classifier_kind {
        ClassifierKind::Onnx => {
            let loader = ModelLoader::with_threads(config.onnx_threads)?;
            let model = loader.load_model(&config.classifier_path)?;
            Arc::new(OnnxClassifier::new(model, schema))
        }
        ClassifierKind::Logistic => {
            Arc::new(LogisticClassifier::load(&config.classifier_path, schema)?)
        }
    };
    Ok(classifier)
}

/// Load the configured scaler
pub fn load_scaler(config: &ModelsConfig) -> Result<Arc<dyn FeatureScaler>> {
    Ok(Arc::new(AffineScaler::load(&config.scaler_path)?))
}

/// Load the schema override, or fall back to the built-in layout
pub fn load_schema(config: &ModelsConfig) -> Result<FeatureSchema> {
    match &config.schema_path {
        Some(path) => FeatureSchema::load(path),
        None => Ok(FeatureSchema::telco()),
    }
}

/// Load a single artifact, logging instead of failing.
///
/// A `None` leaves the pipeline degraded: scoring refuses every request
/// until the process is restarted with the artifact in place.
pub fn load_or_degrade<T>(artifact: &str, load: impl FnOnce() -> Result<T>) -> Option<T> {
    match load() {
        Ok(value) => Some(value),
        Err(e) => {
            let message = format!("{:#}", e);
            error!(artifact, error = %message, "Failed to load artifact, scoring disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn models_config(kind: ClassifierKind, classifier: &Path, scaler: &Path) -> ModelsConfig {
        ModelsConfig {
            classifier_kind: kind,
            classifier_path: classifier.display().to_string(),
            scaler_path: scaler.display().to_string(),
            schema_path: None,
            onnx_threads: 1,
        }
    }

    #[test]
    fn test_load_logistic_and_scaler() {
        let dir = tempfile::tempdir().unwrap();
        let schema = FeatureSchema::new(["tenure", "MonthlyCharges", "total_services"]).unwrap();

        let model_path = dir.path().join("logistic.json");
        let mut model = std::fs::File::create(&model_path).unwrap();
        write!(
            model,
            r#"{{"intercept": 0.1, "coefficients": {{"tenure": -0.5, "MonthlyCharges": 0.3, "total_services": -0.2}}}}"#
        )
        .unwrap();

        let scaler_path = dir.path().join("scaler.json");
        let mut scaler = std::fs::File::create(&scaler_path).unwrap();
        write!(
            scaler,
            r#"{{"kind": "min_max", "min": [0.0, 0.0, 0.0], "scale": [1.0, 1.0, 1.0]}}"#
        )
        .unwrap();

        let config = models_config(ClassifierKind::Logistic, &model_path, &scaler_path);
        let classifier = load_classifier(&config, &schema).unwrap();
        assert_eq!(classifier.name(), "logistic");
        assert!(load_scaler(&config).is_ok());
        assert_eq!(load_schema(&config).unwrap(), FeatureSchema::telco());
    }

    #[test]
    fn test_missing_artifacts_degrade() {
        let dir = tempfile::tempdir().unwrap();
        let config = models_config(
            ClassifierKind::Logistic,
            &dir.path().join("absent.json"),
            &dir.path().join("absent_scaler.json"),
        );

        let schema = FeatureSchema::telco();
        assert!(load_or_degrade("classifier", || load_classifier(&config, &schema)).is_none());
        assert!(load_or_degrade("scaler", || load_scaler(&config)).is_none());
    }
}

//! ONNX-backed churn classifier

use crate::error::{ScoringError, ScoringResult};
use crate::models::classifier::ChurnClassifier;
use crate::models::loader::LoadedModel;
use crate::schema::FeatureSchema;
use crate::types::features::FeatureVector;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::sync::Mutex;
use tracing::debug;

/// Raw outputs of one inference run
#[derive(Debug, Clone, Copy)]
struct ModelOutput {
    label: i64,
    probabilities: [f64; 2],
}

/// Classifier backed by an ONNX export of the trained model.
///
/// Running a session needs exclusive access, so concurrent callers take
/// turns on the mutex; no state survives between runs. One run yields both
/// the label and the probabilities, so `classify` answers a request with a
/// single session run while `predict` and `predict_probability` each run it.
pub struct OnnxClassifier {
    model: Mutex<LoadedModel>,
    /// Expected input width (schema length)
    width: usize,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel, schema: &FeatureSchema) -> Self {
        Self {
            model: Mutex::new(model),
            width: schema.len(),
        }
    }

    fn run(&self, features: &FeatureVector) -> ScoringResult<ModelOutput> {
        if features.len() != self.width {
            return Err(ScoringError::internal(format!(
                "classifier expects {} features, got {}",
                self.width,
                features.len()
            )));
        }

        let mut guard = self
            .model
            .lock()
            .map_err(|e| ScoringError::internal(format!("Lock error: {}", e)))?;
        let model = &mut *guard;

        run_session(model, features).map_err(|e| ScoringError::internal(format!("{:#}", e)))
    }
}

impl ChurnClassifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn predict(&self, features: &FeatureVector) -> ScoringResult<bool> {
        decision(self.run(features)?.label)
    }

    fn predict_probability(&self, features: &FeatureVector) -> ScoringResult<[f64; 2]> {
        Ok(self.run(features)?.probabilities)
    }

    fn classify(&self, features: &FeatureVector) -> ScoringResult<(bool, [f64; 2])> {
        let output = self.run(features)?;
        Ok((decision(output.label)?, output.probabilities))
    }
}

/// Map the model's predicted label to the churn decision.
///
/// The label carries the model's own threshold; anything but 0 or 1 is an
/// error rather than a re-derived decision.
fn decision(label: i64) -> ScoringResult<bool> {
    match label {
        1 => Ok(true),
        0 => Ok(false),
        other => Err(ScoringError::internal(format!(
            "model predicted unknown class label {}",
            other
        ))),
    }
}

/// First value of the label output
fn label_from_output(data: &[i64]) -> Result<i64> {
    data.first().copied().context("Label output is empty")
}

fn run_session(model: &mut LoadedModel, features: &FeatureVector) -> Result<ModelOutput> {
    // Shape [1, num_features]
    let shape = vec![1_i64, features.len() as i64];
    let input_tensor =
        Tensor::from_array((shape, features.to_f32())).context("Failed to create input tensor")?;

    let outputs = model
        .session
        .run(ort::inputs![model.input_name.as_str() => input_tensor])?;

    let label_output = outputs
        .get(model.label_name.as_str())
        .with_context(|| format!("Model produced no '{}' output", model.label_name))?;
    let (_, label_data) = label_output
        .try_extract_tensor::<i64>()
        .context("Label output is not an int64 tensor")?;
    let label = label_from_output(label_data)?;

    let output = outputs
        .get(model.probability_name.as_str())
        .with_context(|| format!("Model produced no '{}' output", model.probability_name))?;

    let probabilities = if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        probabilities_from_tensor(&shape.iter().copied().collect::<Vec<i64>>(), data)?
    } else {
        let dtype = output.dtype();
        if !DynSequenceValueType::can_downcast(&dtype) {
            anyhow::bail!("Unsupported probability output type: {:?}", dtype);
        }
        probabilities_from_sequence_map(output)?
    };

    debug!(label = ?label, probabilities = ?probabilities, "ONNX inference complete");

    Ok(ModelOutput {
        label,
        probabilities,
    })
}

/// Read `[p_negative, p_positive]` from a probability tensor
fn probabilities_from_tensor(dims: &[i64], data: &[f32]) -> Result<[f64; 2]> {
    let classes = dims.last().copied().unwrap_or(0);
    match (classes, data) {
        (2, [p0, p1, ..]) => Ok([*p0 as f64, *p1 as f64]),
        (1, [p1, ..]) => Ok([1.0 - *p1 as f64, *p1 as f64]),
        _ => anyhow::bail!("Unexpected probability tensor shape {:?}", dims),
    }
}

/// Read probabilities from the `seq(map(int64, float))` form some
/// exporters (zipmap) produce
fn probabilities_from_sequence_map(output: &ort::value::DynValue) -> Result<[f64; 2]> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let map_value = maps.first().context("Empty probability sequence")?;

    // Batch size is always 1
    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

    let class_prob = |class: i64| {
        kv_pairs
            .iter()
            .find(|(id, _)| *id == class)
            .map(|(_, p)| *p as f64)
    };

    match (class_prob(0), class_prob(1)) {
        (Some(p0), Some(p1)) => Ok([p0, p1]),
        (None, Some(p1)) => Ok([1.0 - p1, p1]),
        (Some(p0), None) => Ok([p0, 1.0 - p0]),
        (None, None) => anyhow::bail!("No class probabilities found in map"),
    }
}

//! Pre-fitted numeric scaling for the continuous feature columns

use crate::error::{ScoringError, ScoringResult};
use crate::schema::{FeatureSchema, SCALED_COLUMNS};
use crate::types::features::FeatureVector;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Number of columns the scaler was fitted on
pub const SCALED_WIDTH: usize = SCALED_COLUMNS.len();

/// Transform applied to the scaled sub-vector.
///
/// Implementations must be pure: parameters are fixed at load time.
pub trait FeatureScaler: Send + Sync {
    fn transform(&self, columns: [f64; SCALED_WIDTH]) -> ScoringResult<[f64; SCALED_WIDTH]>;
}

/// Per-column affine transform exported from a fitted scaler
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AffineScaler {
    /// `(x - mean) / scale`
    Standard {
        mean: [f64; SCALED_WIDTH],
        scale: [f64; SCALED_WIDTH],
    },
    /// `x * scale + min`
    MinMax {
        min: [f64; SCALED_WIDTH],
        scale: [f64; SCALED_WIDTH],
    },
}

impl AffineScaler {
    /// Load scaler parameters from a JSON export
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler from {}", path.display()))?;
        let scaler: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse scaler {}", path.display()))?;
        scaler.validate()?;

        info!(path = %path.display(), kind = scaler.kind(), "Scaler loaded");
        Ok(scaler)
    }

    /// Reject parameters that would produce non-finite outputs
    pub fn validate(&self) -> Result<()> {
        let (offset, scale) = self.parameters();
        if offset.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            bail!("Scaler parameters must be finite");
        }
        if matches!(self, AffineScaler::Standard { .. }) && scale.iter().any(|&s| s == 0.0) {
            bail!("Standard scaler has a zero scale");
        }
        Ok(())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AffineScaler::Standard { .. } => "standard",
            AffineScaler::MinMax { .. } => "min_max",
        }
    }

    fn parameters(&self) -> (&[f64; SCALED_WIDTH], &[f64; SCALED_WIDTH]) {
        match self {
            AffineScaler::Standard { mean, scale } => (mean, scale),
            AffineScaler::MinMax { min, scale } => (min, scale),
        }
    }
}

impl FeatureScaler for AffineScaler {
    fn transform(&self, columns: [f64; SCALED_WIDTH]) -> ScoringResult<[f64; SCALED_WIDTH]> {
        let mut out = columns;
        match self {
            AffineScaler::Standard { mean, scale } => {
                for i in 0..SCALED_WIDTH {
                    out[i] = (columns[i] - mean[i]) / scale[i];
                }
            }
            AffineScaler::MinMax { min, scale } => {
                for i in 0..SCALED_WIDTH {
                    out[i] = columns[i] * scale[i] + min[i];
                }
            }
        }
        Ok(out)
    }
}

/// Applies a scaler to the scaled columns of a feature vector in place.
///
/// Column positions are resolved against the schema once, at construction.
pub struct ScalerAdapter {
    positions: [usize; SCALED_WIDTH],
}

impl ScalerAdapter {
    pub fn new(schema: &FeatureSchema) -> ScoringResult<Self> {
        let mut positions = [0; SCALED_WIDTH];
        for (slot, column) in positions.iter_mut().zip(SCALED_COLUMNS) {
            *slot = schema.index_of(column).ok_or_else(|| {
                ScoringError::internal(format!("schema has no scaled column '{}'", column))
            })?;
        }
        Ok(Self { positions })
    }

    /// Replace the scaled columns with the scaler output; every other
    /// position is left untouched.
    pub fn apply(&self, scaler: &dyn FeatureScaler, row: &mut FeatureVector) -> ScoringResult<()> {
        let values = row.values_mut();
        let mut columns = [0.0; SCALED_WIDTH];
        for (column, &pos) in columns.iter_mut().zip(&self.positions) {
            *column = *values
                .get(pos)
                .ok_or_else(|| ScoringError::internal("feature vector shorter than schema"))?;
        }

        let scaled = scaler.transform(columns)?;
        if scaled.iter().any(|v| !v.is_finite()) {
            return Err(ScoringError::internal("scaler produced a non-finite value"));
        }

        for (&pos, value) in self.positions.iter().zip(scaled) {
            values[pos] = value;
        }
        Ok(())
    }
}

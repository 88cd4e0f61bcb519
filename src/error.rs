//! Error taxonomy for the scoring path

use serde::Serialize;
use std::fmt;

/// Result type for scoring operations
pub type ScoringResult<T> = std::result::Result<T, ScoringError>;

/// Process-wide artifact that scoring depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Artifact {
    Classifier,
    Scaler,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Classifier => write!(f, "classifier"),
            Artifact::Scaler => write!(f, "scaler"),
        }
    }
}

/// Errors that reject a scoring request.
///
/// None of these is ever converted into a default prediction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    /// Classifier or scaler was not loaded at startup
    #[error("{0} not loaded")]
    MissingArtifact(Artifact),

    /// A field holds a value outside what its encoding accepts
    #[error("invalid value for field '{field}': {value}")]
    InvalidFieldValue { field: String, value: String },

    /// No record was supplied
    #[error("no customer data provided")]
    EmptyInput,

    /// Any other fault during encoding, scaling or inference
    #[error("{0}")]
    Internal(String),
}

impl ScoringError {
    pub fn invalid_field(field: &str, value: impl ToString) -> Self {
        ScoringError::InvalidFieldValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn internal(message: impl ToString) -> Self {
        ScoringError::Internal(message.to_string())
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::MissingArtifact(_) => "missing_artifact",
            ScoringError::InvalidFieldValue { .. } => "invalid_field_value",
            ScoringError::EmptyInput => "empty_input",
            ScoringError::Internal(_) => "internal",
        }
    }

    /// Offending field, when the error concerns one
    pub fn field(&self) -> Option<&str> {
        match self {
            ScoringError::InvalidFieldValue { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Structured error description returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&ScoringError> for ErrorResponse {
    fn from(err: &ScoringError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind(),
            field: err.field().map(str::to_string),
        }
    }
}

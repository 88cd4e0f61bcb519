//! Feature schema registry.
//!
//! The ordered list of feature names the classifier was trained against.
//! Built once at startup and shared read-only; every feature vector the
//! pipeline produces has exactly this length and column order.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Columns rewritten by the scaler, in the order the scaler expects them
pub const SCALED_COLUMNS: [&str; 3] = ["tenure", "MonthlyCharges", "total_services"];

/// Training-time column layout of the churn classifier
pub const TELCO_FEATURE_LAYOUT: &[&str] = &[
    // Demographic / account (0-8)
    "gender",
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "tenure",
    "PhoneService",
    "PaperlessBilling",
    "MonthlyCharges",
    "total_services",
    // One-hot indicators (9-29)
    "MultipleLines_No phone service",
    "MultipleLines_Yes",
    "InternetService_Fiber optic",
    "InternetService_No",
    "OnlineSecurity_No internet service",
    "OnlineSecurity_Yes",
    "OnlineBackup_No internet service",
    "OnlineBackup_Yes",
    "DeviceProtection_No internet service",
    "DeviceProtection_Yes",
    "TechSupport_No internet service",
    "TechSupport_Yes",
    "StreamingTV_No internet service",
    "StreamingTV_Yes",
    "StreamingMovies_No internet service",
    "StreamingMovies_Yes",
    "Contract_One year",
    "Contract_Two year",
    "PaymentMethod_Credit card (automatic)",
    "PaymentMethod_Electronic check",
    "PaymentMethod_Mailed check",
];

/// On-disk forms accepted for an exported schema
#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaFile {
    List(Vec<String>),
    Object { feature_names: Vec<String> },
}

/// Immutable, ordered feature-name registry
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a registry from an ordered list of names.
    ///
    /// Fails on an empty list, duplicate names, or a list that lacks any of
    /// the scaled columns.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            bail!("Feature schema is empty");
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                bail!("Duplicate feature name in schema: {}", name);
            }
        }

        for column in SCALED_COLUMNS {
            if !seen.contains(column) {
                bail!("Feature schema is missing scaled column '{}'", column);
            }
        }

        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Ok(Self { names, index })
    }

    /// The layout the reference churn classifier was trained on
    pub fn telco() -> Self {
        let names: Vec<String> = TELCO_FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Load an exported schema: either a bare JSON array of names or an
    /// object with a `feature_names` array.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature schema from {}", path.display()))?;
        let names = match serde_json::from_str::<SchemaFile>(&raw)
            .with_context(|| format!("Failed to parse feature schema {}", path.display()))?
        {
            SchemaFile::List(names) => names,
            SchemaFile::Object { feature_names } => feature_names,
        };
        Self::new(names)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::telco()
    }
}

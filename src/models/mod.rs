//! Model artifacts: classifier, scaler and their loaders

pub mod classifier;
pub mod inference;
pub mod loader;
pub mod scaler;

pub use classifier::{ChurnClassifier, LogisticClassifier};
pub use inference::OnnxClassifier;
pub use loader::ModelLoader;
pub use scaler::{AffineScaler, FeatureScaler, ScalerAdapter};

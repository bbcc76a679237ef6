//! Model artifacts, scaling and classifier inference

pub mod inference;
pub mod loader;
pub mod scaler;

pub use inference::{Classifier, InferenceEngine, OnnxClassifier};
pub use loader::{ModelArtifacts, ModelLoader};
pub use scaler::{scale, ScalingSpec};

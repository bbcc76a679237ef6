//! Model artifact loading

use crate::config::ArtifactsConfig;
use crate::models::inference::{InferenceEngine, OnnxClassifier};
use crate::models::scaler::ScalingSpec;
use crate::reconciler::FeatureSchema;
use anyhow::{bail, Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Loader for ONNX classifiers
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        // Initialize ONNX Runtime
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load an ONNX classifier from file
    pub fn load_classifier<P: AsRef<Path>>(
        &self,
        path: P,
        class_labels: Vec<String>,
    ) -> Result<OnnxClassifier> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "classifier".to_string());

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        // Classifiers exported from the training pipeline emit "output_label"
        // alongside the probabilities
        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "output_label".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %label_output,
            "Model loaded successfully"
        );

        Ok(OnnxClassifier::new(
            name,
            session,
            input_name,
            label_output,
            class_labels,
        ))
    }
}

/// Immutable artifacts shared by every pipeline run: the feature schema, the
/// fitted scaling parameters and the classifier
pub struct ModelArtifacts {
    schema: Arc<FeatureSchema>,
    scaling: ScalingSpec,
    engine: InferenceEngine,
}

impl ModelArtifacts {
    pub fn new(schema: FeatureSchema, scaling: ScalingSpec, engine: InferenceEngine) -> Self {
        let missing = scaling.missing_from(&schema);
        if !missing.is_empty() {
            warn!(
                columns = ?missing,
                "Scaling columns have no position in the feature schema and will never be scaled"
            );
        }

        Self {
            schema: Arc::new(schema),
            scaling,
            engine,
        }
    }

    /// Load all three artifacts. Any missing or unreadable artifact fails.
    pub fn load(config: &ArtifactsConfig) -> Result<Self> {
        for (kind, path) in [
            ("model", &config.model_path),
            ("scaler", &config.scaler_path),
            ("schema", &config.schema_path),
        ] {
            if !Path::new(path).is_file() {
                bail!("Model artifact '{}' not found at {}", kind, path);
            }
        }

        let schema = FeatureSchema::load(&config.schema_path)?;
        let scaling = ScalingSpec::load(&config.scaler_path)?;

        let loader = ModelLoader::with_threads(config.onnx_threads)?;
        let classifier = loader.load_classifier(&config.model_path, config.class_labels.clone())?;
        let engine = InferenceEngine::new(Box::new(classifier), config.positive_label.clone());

        info!(
            features = schema.len(),
            scaled_columns = scaling.len(),
            model = %engine.model_name(),
            "Model artifacts loaded"
        );

        Ok(Self::new(schema, scaling, engine))
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn scaling(&self) -> &ScalingSpec {
        &self.scaling
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_missing_artifact_fails_fast() {
        let schema = write_temp(r#"["witnesses"]"#);
        let scaler = write_temp(r#"{"columns": [], "mean": [], "scale": []}"#);

        let config = ArtifactsConfig {
            model_path: "/nonexistent/fraud_model.onnx".to_string(),
            scaler_path: scaler.path().display().to_string(),
            schema_path: schema.path().display().to_string(),
            ..ArtifactsConfig::default()
        };

        let err = ModelArtifacts::load(&config).err().unwrap();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn test_corrupted_schema_fails_before_model_load() {
        let model = write_temp("not an onnx model");
        let schema = write_temp(r#"["witnesses", "witnesses"]"#);
        let scaler = write_temp(r#"{"columns": [], "mean": [], "scale": []}"#);

        let config = ArtifactsConfig {
            model_path: model.path().display().to_string(),
            scaler_path: scaler.path().display().to_string(),
            schema_path: schema.path().display().to_string(),
            ..ArtifactsConfig::default()
        };

        let err = ModelArtifacts::load(&config).err().unwrap();
        assert!(format!("{:#}", err).contains("duplicate column"));
    }
}

//! Classifier inference for claim verdicts

use crate::error::ClaimError;
use crate::reconciler::FeatureVector;
use crate::types::verdict::Verdict;
use ort::session::Session;
use ort::value::Tensor;
use std::sync::Mutex;
use tracing::debug;

/// A trained binary classifier producing one raw label per feature row
pub trait Classifier: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Predict the raw class label for one feature row
    fn predict_label(&self, features: &[f32]) -> Result<String, ClaimError>;
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    name: String,
    /// Running a session needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    /// Class labels in training order, for models emitting integer labels
    class_labels: Vec<String>,
}

impl OnnxClassifier {
    pub fn new(
        name: String,
        session: Session,
        input_name: String,
        label_output: String,
        class_labels: Vec<String>,
    ) -> Self {
        Self {
            name,
            session: Mutex::new(session),
            input_name,
            label_output,
            class_labels,
        }
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn label_output(&self) -> &str {
        &self.label_output
    }

    fn label_for_index(&self, index: i64) -> Result<String, ClaimError> {
        usize::try_from(index)
            .ok()
            .and_then(|idx| self.class_labels.get(idx))
            .cloned()
            .ok_or_else(|| {
                ClaimError::Inference(format!(
                    "label index {} outside class labels {:?}",
                    index, self.class_labels
                ))
            })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_label(&self, features: &[f32]) -> Result<String, ClaimError> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor =
            Tensor::from_array((shape, features.to_vec())).map_err(ClaimError::inference)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ClaimError::Inference(format!("Lock error: {}", e)))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(ClaimError::inference)?;

        let output = outputs.get(self.label_output.as_str()).ok_or_else(|| {
            ClaimError::Inference(format!("model has no '{}' output", self.label_output))
        })?;

        // String labels (classifiers trained on "Y"/"N" targets)
        if let Ok((_, labels)) = output.try_extract_strings() {
            return labels
                .into_iter()
                .next()
                .ok_or_else(|| ClaimError::Inference("empty label output".to_string()));
        }

        // Integer labels index into the class list
        if let Ok((_, labels)) = output.try_extract_tensor::<i64>() {
            let index = *labels
                .first()
                .ok_or_else(|| ClaimError::Inference("empty label output".to_string()))?;
            return self.label_for_index(index);
        }

        Err(ClaimError::Inference(format!(
            "unsupported label output type {:?}",
            output.dtype()
        )))
    }
}

/// Inference engine wrapping a single loaded classifier
pub struct InferenceEngine {
    classifier: Box<dyn Classifier>,
    /// Raw label of the fraudulent class
    positive_label: String,
}

impl InferenceEngine {
    pub fn new(classifier: Box<dyn Classifier>, positive_label: impl Into<String>) -> Self {
        Self {
            classifier,
            positive_label: positive_label.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn positive_label(&self) -> &str {
        &self.positive_label
    }

    /// Classify one reconciled, scaled vector
    pub fn predict(&self, vector: &FeatureVector) -> Result<Verdict, ClaimError> {
        if let Some(idx) = vector.values().iter().position(|v| !v.is_finite()) {
            return Err(ClaimError::Inference(format!(
                "non-finite value in column '{}'",
                vector.schema().columns()[idx]
            )));
        }

        let label = self.classifier.predict_label(vector.values())?;
        let verdict = Verdict::from_label(&label, &self.positive_label);

        debug!(
            model = %self.classifier.name(),
            label = %label,
            verdict = %verdict,
            "Classifier inference complete"
        );

        Ok(verdict)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::reconciler::{reconcile, FeatureSchema};
    use crate::types::claim::ClaimRecord;
    use std::sync::Arc;

    /// Labels a claim as the positive class when its first feature exceeds
    /// the threshold
    pub(crate) struct ThresholdClassifier {
        pub threshold: f32,
    }

    impl Classifier for ThresholdClassifier {
        fn name(&self) -> &str {
            "threshold"
        }

        fn predict_label(&self, features: &[f32]) -> Result<String, ClaimError> {
            let first = features
                .first()
                .ok_or_else(|| ClaimError::Inference("no features".to_string()))?;
            Ok(if *first > self.threshold { "Y" } else { "N" }.to_string())
        }
    }

    struct FixedClassifier(&'static str);

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict_label(&self, _features: &[f32]) -> Result<String, ClaimError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict_label(&self, features: &[f32]) -> Result<String, ClaimError> {
            Err(ClaimError::Inference(format!(
                "expected 40 features, got {}",
                features.len()
            )))
        }
    }

    fn vector() -> FeatureVector {
        let schema = Arc::new(FeatureSchema::new(vec!["witnesses".to_string()]).unwrap());
        reconcile(&ClaimRecord::new().with("witnesses", 1_i64), &schema).unwrap()
    }

    #[test]
    fn test_positive_label_is_fraud() {
        let engine = InferenceEngine::new(Box::new(FixedClassifier("Y")), "Y");
        assert_eq!(engine.predict(&vector()).unwrap(), Verdict::Fraud);
    }

    #[test]
    fn test_other_label_is_legit() {
        let engine = InferenceEngine::new(Box::new(FixedClassifier("N")), "Y");
        assert_eq!(engine.predict(&vector()).unwrap(), Verdict::Legit);
    }

    #[test]
    fn test_classifier_errors_propagate() {
        let engine = InferenceEngine::new(Box::new(FailingClassifier), "Y");
        let err = engine.predict(&vector()).unwrap_err();
        assert_eq!(err.kind(), "inference");
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let schema = Arc::new(FeatureSchema::new(vec!["injury_claim".to_string()]).unwrap());
        let record = ClaimRecord::new().with("injury_claim", f64::MAX);
        let vector = reconcile(&record, &schema).unwrap();

        let engine = InferenceEngine::new(Box::new(FixedClassifier("Y")), "Y");
        let err = engine.predict(&vector).unwrap_err();

        assert!(matches!(err, ClaimError::Inference(_)));
        assert!(err.to_string().contains("injury_claim"));
    }

    #[test]
    fn test_threshold_classifier() {
        let engine = InferenceEngine::new(Box::new(ThresholdClassifier { threshold: 0.5 }), "Y");
        assert_eq!(engine.predict(&vector()).unwrap(), Verdict::Fraud);
        assert_eq!(engine.model_name(), "threshold");
    }
}

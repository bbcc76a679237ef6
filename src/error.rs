//! Error taxonomy for a single claim's pipeline run

use thiserror::Error;

/// Errors raised while processing one claim message.
///
/// Startup failures (config, artifacts, transport) are not part of this
/// taxonomy; they abort the process through `anyhow`.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Reconciled vector does not match the feature schema, or the schema
    /// artifact itself is corrupted
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Classifier rejected the input or produced unreadable output
    #[error("inference failed: {0}")]
    Inference(String),

    /// Graph store unreachable, rejected the write, or timed out
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Payload is not a structured claim record
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

impl ClaimError {
    /// Stable identifier used in logs, metrics and dead letters
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimError::SchemaMismatch(_) => "schema_mismatch",
            ClaimError::Inference(_) => "inference",
            ClaimError::Persistence(_) => "persistence",
            ClaimError::MalformedMessage(_) => "malformed_message",
        }
    }

    pub(crate) fn inference(err: impl std::fmt::Display) -> Self {
        ClaimError::Inference(err.to_string())
    }

    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        ClaimError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for ClaimError {
    fn from(err: serde_json::Error) -> Self {
        ClaimError::MalformedMessage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ClaimError::SchemaMismatch("x".into()).kind(),
            "schema_mismatch"
        );
        assert_eq!(ClaimError::Inference("x".into()).kind(), "inference");
        assert_eq!(ClaimError::Persistence("x".into()).kind(), "persistence");
        assert_eq!(
            ClaimError::MalformedMessage("x".into()).kind(),
            "malformed_message"
        );
    }

    #[test]
    fn test_json_errors_are_malformed_messages() {
        let err: ClaimError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), "malformed_message");
    }
}

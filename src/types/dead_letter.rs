//! Pipeline stages and dead letters for failed claims

use crate::error::ClaimError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-message processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStage {
    Received,
    Reconciled,
    Scaled,
    Scored,
    Persisted,
    Acknowledged,
    Failed,
}

impl ClaimStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStage::Received => "received",
            ClaimStage::Reconciled => "reconciled",
            ClaimStage::Scaled => "scaled",
            ClaimStage::Scored => "scored",
            ClaimStage::Persisted => "persisted",
            ClaimStage::Acknowledged => "acknowledged",
            ClaimStage::Failed => "failed",
        }
    }
}

impl fmt::Display for ClaimStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a claim message that failed processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    /// Unique dead letter identifier
    pub letter_id: String,

    /// Claim identifier, when it could be recovered from the payload
    pub claim_id: Option<String>,

    /// Last stage the message reached before failing
    pub stage: ClaimStage,

    /// Error kind (see [`ClaimError::kind`])
    pub error_kind: String,

    /// Error message
    pub error: String,

    /// Original payload, lossily decoded as UTF-8
    pub payload: String,

    pub failed_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(
        claim_id: Option<String>,
        stage: ClaimStage,
        error: &ClaimError,
        payload: &[u8],
    ) -> Self {
        Self {
            letter_id: uuid::Uuid::new_v4().to_string(),
            claim_id,
            stage,
            error_kind: error.kind().to_string(),
            error: error.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            failed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_letter_serialization() {
        let error = ClaimError::Persistence("connection refused".to_string());
        let letter = DeadLetter::new(
            Some("A1".to_string()),
            ClaimStage::Scored,
            &error,
            br#"{"policy_number":"A1"}"#,
        );

        let json = serde_json::to_value(&letter).unwrap();
        assert_eq!(json["stage"], "scored");
        assert_eq!(json["error_kind"], "persistence");
        assert_eq!(json["claim_id"], "A1");
        assert_eq!(json["payload"], r#"{"policy_number":"A1"}"#);

        let back: DeadLetter = serde_json::from_value(json).unwrap();
        assert_eq!(back.letter_id, letter.letter_id);
    }

    #[test]
    fn test_binary_payload_is_kept_lossily() {
        let error = ClaimError::MalformedMessage("bad".to_string());
        let letter = DeadLetter::new(None, ClaimStage::Received, &error, &[0xff, b'a']);
        assert!(letter.payload.ends_with('a'));
        assert!(letter.claim_id.is_none());
    }
}

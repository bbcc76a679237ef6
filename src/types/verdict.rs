//! Verdict data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary classification outcome for a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Fraud,
    Legit,
}

impl Verdict {
    /// Map a raw classifier label: the positive class is fraud, anything
    /// else is legitimate
    pub fn from_label(label: &str, positive_label: &str) -> Self {
        if label == positive_label {
            Verdict::Fraud
        } else {
            Verdict::Legit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Fraud => "FRAUD",
            Verdict::Legit => "LEGIT",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit persisted to the graph store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub claim_id: String,
    pub verdict: Verdict,
    pub incident_type: String,
}

impl VerdictRecord {
    pub fn new(claim_id: impl Into<String>, verdict: Verdict, incident_type: impl Into<String>) -> Self {
        Self {
            claim_id: claim_id.into(),
            verdict,
            incident_type: incident_type.into(),
        }
    }
}

//! Claim data structures for fraud classification

use crate::error::ClaimError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute holding the claim identifier
pub const CLAIM_ID_FIELD: &str = "policy_number";

/// Attribute holding the incident type used for the graph edge
pub const INCIDENT_TYPE_FIELD: &str = "incident_type";

/// Incident type recorded when a claim does not carry one
pub const UNKNOWN_INCIDENT_TYPE: &str = "Unknown";

/// Scalar value of a claim attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ClaimValue {
    /// Render the value the way it appears in encoded column names.
    ///
    /// Integral numbers drop their fractional part so `12345.0` renders as
    /// `12345`.
    pub fn render(&self) -> String {
        match self {
            ClaimValue::Bool(true) => "True".to_string(),
            ClaimValue::Bool(false) => "False".to_string(),
            ClaimValue::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            ClaimValue::Number(n) => n.to_string(),
            ClaimValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        ClaimValue::Number(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        ClaimValue::Number(value as f64)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        ClaimValue::Bool(value)
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::Text(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::Text(value)
    }
}

/// An inbound claim: attribute name to scalar value.
///
/// The key set is arbitrary. JSON `null` attributes are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClaimRecord {
    attributes: BTreeMap<String, ClaimValue>,
}

impl ClaimRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a queue payload into a record.
    ///
    /// Fails when the payload is not a JSON object of scalar values.
    pub fn from_slice(payload: &[u8]) -> Result<Self, ClaimError> {
        let raw: BTreeMap<String, Option<ClaimValue>> = serde_json::from_slice(payload)?;
        let attributes = raw
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name, value)))
            .collect();
        Ok(Self { attributes })
    }

    /// Add an attribute
    pub fn with(mut self, name: &str, value: impl Into<ClaimValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.attributes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClaimValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Claim identifier (the policy number), if present
    pub fn claim_id(&self) -> Option<String> {
        self.get(CLAIM_ID_FIELD).map(ClaimValue::render)
    }

    /// Incident type of the claim, `"Unknown"` when absent
    pub fn incident_type(&self) -> String {
        match self.get(INCIDENT_TYPE_FIELD) {
            Some(ClaimValue::Text(kind)) => kind.clone(),
            Some(other) => other.render(),
            None => UNKNOWN_INCIDENT_TYPE.to_string(),
        }
    }
}

/// Best-effort claim identifier from a raw payload.
///
/// Used for logging when the payload cannot be parsed as a [`ClaimRecord`].
pub fn peek_claim_id(payload: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    match value.get(CLAIM_ID_FIELD)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Claim as accepted by the ingestion endpoint.
///
/// The numeric fields are required; any other scalar attribute (categorical
/// fields such as `incident_type`) is carried through in `categorical`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimSubmission {
    pub policy_number: String,
    pub months_as_customer: i64,
    pub policy_deductable: i64,
    pub umbrella_limit: i64,
    pub capital_gains: i64,
    pub capital_loss: i64,
    pub incident_hour_of_the_day: i64,
    pub number_of_vehicles_involved: i64,
    pub bodily_injuries: i64,
    pub witnesses: i64,
    pub injury_claim: f64,
    pub property_claim: f64,
    pub vehicle_claim: f64,

    /// Optional categorical attributes
    #[serde(flatten)]
    pub categorical: BTreeMap<String, serde_json::Value>,
}

impl ClaimSubmission {
    /// Create a submission with zeroed numeric fields
    pub fn new(policy_number: String) -> Self {
        Self {
            policy_number,
            months_as_customer: 0,
            policy_deductable: 0,
            umbrella_limit: 0,
            capital_gains: 0,
            capital_loss: 0,
            incident_hour_of_the_day: 0,
            number_of_vehicles_involved: 0,
            bodily_injuries: 0,
            witnesses: 0,
            injury_claim: 0.0,
            property_claim: 0.0,
            vehicle_claim: 0.0,
            categorical: BTreeMap::new(),
        }
    }

    /// Add a categorical attribute
    pub fn with_category(mut self, name: &str, value: &str) -> Self {
        self.categorical
            .insert(name.to_string(), serde_json::Value::String(value.to_string()));
        self
    }

    /// Reject categorical attributes that are not scalars
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in &self.categorical {
            if value.is_array() || value.is_object() {
                return Err(format!("attribute '{}' must be a scalar value", name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_payload() {
        let payload = br#"{
            "policy_number": "A1",
            "months_as_customer": 5,
            "incident_type": "Collision",
            "police_report_available": true,
            "authorities_contacted": null
        }"#;

        let record = ClaimRecord::from_slice(payload).unwrap();

        assert_eq!(record.len(), 4);
        assert_eq!(record.get("months_as_customer"), Some(&ClaimValue::Number(5.0)));
        assert_eq!(
            record.get("police_report_available"),
            Some(&ClaimValue::Bool(true))
        );
        assert!(record.get("authorities_contacted").is_none());
        assert_eq!(record.claim_id().as_deref(), Some("A1"));
        assert_eq!(record.incident_type(), "Collision");
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        assert!(ClaimRecord::from_slice(b"not json").is_err());
        assert!(ClaimRecord::from_slice(b"[1, 2, 3]").is_err());
        assert!(ClaimRecord::from_slice(br#"{"nested": {"a": 1}}"#).is_err());

        let err = ClaimRecord::from_slice(b"\x00\x01").unwrap_err();
        assert_eq!(err.kind(), "malformed_message");
    }

    #[test]
    fn test_numeric_claim_id_renders_integral() {
        let record = ClaimRecord::new().with("policy_number", 521585_i64);
        assert_eq!(record.claim_id().as_deref(), Some("521585"));
        assert_eq!(record.incident_type(), UNKNOWN_INCIDENT_TYPE);
    }

    #[test]
    fn test_peek_claim_id() {
        assert_eq!(
            peek_claim_id(br#"{"policy_number": "B7", "x": [1]}"#).as_deref(),
            Some("B7")
        );
        assert_eq!(peek_claim_id(br#"{"policy_number": 42}"#).as_deref(), Some("42"));
        assert_eq!(peek_claim_id(b"garbage"), None);
    }

    #[test]
    fn test_submission_flattens_categories() {
        let submission = ClaimSubmission::new("A1".to_string())
            .with_category("incident_type", "Collision");

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["incident_type"], "Collision");
        assert_eq!(json["policy_number"], "A1");

        let record = ClaimRecord::from_slice(&serde_json::to_vec(&submission).unwrap()).unwrap();
        assert_eq!(record.incident_type(), "Collision");
        assert_eq!(record.get("vehicle_claim"), Some(&ClaimValue::Number(0.0)));
    }

    #[test]
    fn test_submission_rejects_nested_categories() {
        let mut submission = ClaimSubmission::new("A1".to_string());
        submission
            .categorical
            .insert("tags".to_string(), serde_json::json!(["a", "b"]));
        assert!(submission.validate().is_err());
    }

    #[test]
    fn test_submission_requires_numeric_fields() {
        let result: Result<ClaimSubmission, _> =
            serde_json::from_str(r#"{"policy_number": "A1", "months_as_customer": 3}"#);
        assert!(result.is_err());
    }
}

//! Neo4j verdict writer over the transactional HTTP API

use super::VerdictStore;
use crate::config::GraphConfig;
use crate::error::ClaimError;
use crate::types::verdict::VerdictRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Upsert keyed by claim id and incident type; `MERGE` on the relationship
/// keeps a single edge per pair
const UPSERT_VERDICT: &str = "\
MERGE (c:Claim {id: $id}) \
SET c.fraud_prediction = $verdict \
MERGE (i:Incident {type: $incident_type}) \
MERGE (c)-[r:TYPE_OF]->(i) \
SET r.verdict = $verdict";

// Request/Response types

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    errors: Vec<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    code: String,
    message: String,
}

/// Verdict writer for a Neo4j database
pub struct Neo4jStore {
    http_client: reqwest::Client,
    /// `{url}/db/{database}/tx/commit`
    endpoint: String,
    username: String,
    password: String,
}

impl Neo4jStore {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build graph store HTTP client")?;

        Ok(Self {
            http_client,
            endpoint: format!(
                "{}/db/{}/tx/commit",
                config.url.trim_end_matches('/'),
                config.database
            ),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn commit_request(record: &VerdictRecord) -> CommitRequest<'static> {
        CommitRequest {
            statements: vec![Statement {
                statement: UPSERT_VERDICT,
                parameters: json!({
                    "id": record.claim_id,
                    "verdict": record.verdict.as_str(),
                    "incident_type": record.incident_type,
                }),
            }],
        }
    }
}

/// Neo4j reports statement failures in the body of a 200 response
fn check_errors(response: &CommitResponse) -> Result<(), ClaimError> {
    match response.errors.first() {
        Some(err) => Err(ClaimError::Persistence(format!(
            "{}: {}",
            err.code, err.message
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl VerdictStore for Neo4jStore {
    fn backend(&self) -> &'static str {
        "neo4j"
    }

    async fn persist(&self, record: &VerdictRecord) -> Result<(), ClaimError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(&Self::commit_request(record))
            .send()
            .await
            .map_err(ClaimError::persistence)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClaimError::Persistence(format!(
                "graph store returned {}: {}",
                status, body
            )));
        }

        let body: CommitResponse = response.json().await.map_err(ClaimError::persistence)?;
        check_errors(&body)?;

        debug!(
            claim_id = %record.claim_id,
            verdict = %record.verdict,
            incident_type = %record.incident_type,
            "Verdict upserted"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::types::verdict::Verdict;

    #[test]
    fn test_endpoint_from_config() {
        let mut config = AppConfig::default().graph;
        config.url = "http://graph:7474/".to_string();
        config.database = "claims".to_string();

        let store = Neo4jStore::new(&config).unwrap();

        assert_eq!(store.endpoint(), "http://graph:7474/db/claims/tx/commit");
    }

    #[test]
    fn test_commit_request_parameters() {
        let record = VerdictRecord::new("A1", Verdict::Fraud, "Collision");

        let request = serde_json::to_value(Neo4jStore::commit_request(&record)).unwrap();
        let statement = &request["statements"][0];

        assert_eq!(statement["parameters"]["id"], "A1");
        assert_eq!(statement["parameters"]["verdict"], "FRAUD");
        assert_eq!(statement["parameters"]["incident_type"], "Collision");
        assert!(statement["statement"]
            .as_str()
            .unwrap()
            .contains("MERGE (c)-[r:TYPE_OF]->(i)"));
    }

    #[test]
    fn test_statement_errors_become_persistence_errors() {
        let response: CommitResponse = serde_json::from_str(
            r#"{"results": [], "errors": [{"code": "Neo.ClientError.Security.Unauthorized", "message": "bad credentials"}]}"#,
        )
        .unwrap();

        let err = check_errors(&response).unwrap_err();
        assert_eq!(err.kind(), "persistence");
        assert!(err.to_string().contains("Unauthorized"));

        let ok: CommitResponse = serde_json::from_str(r#"{"results": [{}], "errors": []}"#).unwrap();
        assert!(check_errors(&ok).is_ok());
    }
}

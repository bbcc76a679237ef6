//! Process-local verdict graph

use super::VerdictStore;
use crate::error::ClaimError;
use crate::types::verdict::{Verdict, VerdictRecord};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct GraphState {
    /// Claim id -> verdict attribute
    claims: HashMap<String, Verdict>,
    incidents: HashSet<String>,
    /// (claim id, incident type) -> verdict annotation
    edges: HashMap<(String, String), Verdict>,
}

/// In-memory graph with the same upsert semantics as the Neo4j writer
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    state: RwLock<GraphState>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim_count(&self) -> usize {
        self.state.read().map(|s| s.claims.len()).unwrap_or(0)
    }

    pub fn incident_count(&self) -> usize {
        self.state.read().map(|s| s.incidents.len()).unwrap_or(0)
    }

    pub fn edge_count(&self) -> usize {
        self.state.read().map(|s| s.edges.len()).unwrap_or(0)
    }

    /// Verdict recorded on a claim node
    pub fn claim_verdict(&self, claim_id: &str) -> Option<Verdict> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.claims.get(claim_id).copied())
    }

    /// Verdict annotation on the edge between a claim and an incident type
    pub fn edge_verdict(&self, claim_id: &str, incident_type: &str) -> Option<Verdict> {
        self.state.read().ok().and_then(|s| {
            s.edges
                .get(&(claim_id.to_string(), incident_type.to_string()))
                .copied()
        })
    }
}

#[async_trait]
impl VerdictStore for InMemoryGraph {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn persist(&self, record: &VerdictRecord) -> Result<(), ClaimError> {
        let mut state = self
            .state
            .write()
            .map_err(|e| ClaimError::Persistence(format!("Lock error: {}", e)))?;

        state.claims.insert(record.claim_id.clone(), record.verdict);
        state.incidents.insert(record.incident_type.clone());
        state.edges.insert(
            (record.claim_id.clone(), record.incident_type.clone()),
            record.verdict,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_repeated_persist_is_idempotent() {
        let graph = InMemoryGraph::new();
        let record = VerdictRecord::new("A1", Verdict::Fraud, "Collision");

        graph.persist(&record).await.unwrap();
        graph.persist(&record).await.unwrap();

        assert_eq!(graph.claim_count(), 1);
        assert_eq!(graph.incident_count(), 1);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.claim_verdict("A1"), Some(Verdict::Fraud));
        assert_eq!(graph.edge_verdict("A1", "Collision"), Some(Verdict::Fraud));
    }

    #[tokio::test]
    async fn test_incident_nodes_are_shared() {
        let graph = InMemoryGraph::new();

        graph
            .persist(&VerdictRecord::new("A1", Verdict::Fraud, "Collision"))
            .await
            .unwrap();
        graph
            .persist(&VerdictRecord::new("A2", Verdict::Legit, "Collision"))
            .await
            .unwrap();

        assert_eq!(graph.claim_count(), 2);
        assert_eq!(graph.incident_count(), 1);
        assert_eq!(graph.edge_count(), 2);
    }

    #[tokio::test]
    async fn test_reclassification_updates_in_place() {
        let graph = InMemoryGraph::new();

        graph
            .persist(&VerdictRecord::new("A1", Verdict::Legit, "Theft"))
            .await
            .unwrap();
        graph
            .persist(&VerdictRecord::new("A1", Verdict::Fraud, "Theft"))
            .await
            .unwrap();

        assert_eq!(graph.claim_count(), 1);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.claim_verdict("A1"), Some(Verdict::Fraud));
        assert_eq!(graph.edge_verdict("A1", "Theft"), Some(Verdict::Fraud));
    }
}

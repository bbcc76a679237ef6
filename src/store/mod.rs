//! Graph store writers for claim verdicts

pub mod memory;
pub mod neo4j;

use crate::config::{GraphBackend, GraphConfig};
use crate::error::ClaimError;
use crate::types::verdict::VerdictRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use memory::InMemoryGraph;
pub use neo4j::Neo4jStore;

/// Idempotent verdict writer.
///
/// Persisting the same record any number of times leaves the store in the
/// same state as persisting it once: one claim node carrying the verdict,
/// one incident node, one edge between them.
#[async_trait]
pub trait VerdictStore: Send + Sync {
    /// Backend name for logs
    fn backend(&self) -> &'static str;

    /// Upsert the claim, its incident type and the edge between them
    async fn persist(&self, record: &VerdictRecord) -> Result<(), ClaimError>;
}

/// Build the configured store backend
pub fn from_config(config: &GraphConfig) -> Result<Arc<dyn VerdictStore>> {
    let store: Arc<dyn VerdictStore> = match config.backend {
        GraphBackend::Neo4j => Arc::new(Neo4jStore::new(config)?),
        GraphBackend::Memory => Arc::new(InMemoryGraph::new()),
    };
    Ok(store)
}

//! Configuration management for the claim worker

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Graph store backend for verdicts
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackend {
    /// Neo4j over its transactional HTTP API
    #[default]
    Neo4j,
    /// Process-local graph, for dry runs
    Memory,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifacts: ArtifactsConfig,
    pub graph: GraphConfig,
    pub worker: WorkerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject the ingestion endpoint publishes claims to
    pub claim_subject: String,
    /// JetStream stream capturing the claim subject
    pub stream: String,
    /// Durable pull consumer the worker binds to
    pub consumer: String,
    /// Subject for failed claims; failures are discarded when unset
    #[serde(default)]
    pub dead_letter_subject: Option<String>,
}

/// Model artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Trained classifier (ONNX)
    pub model_path: String,
    /// Fitted scaler parameters (JSON)
    pub scaler_path: String,
    /// Ordered training columns (JSON array)
    pub schema_path: String,
    /// Raw label of the fraudulent class
    #[serde(default = "default_positive_label")]
    pub positive_label: String,
    /// Class labels in training order, for models emitting integer labels
    #[serde(default = "default_class_labels")]
    pub class_labels: Vec<String>,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_positive_label() -> String {
    "Y".to_string()
}

fn default_class_labels() -> Vec<String> {
    vec!["N".to_string(), "Y".to_string()]
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: "models/fraud_model.onnx".to_string(),
            scaler_path: "models/scaler.json".to_string(),
            schema_path: "models/model_columns.json".to_string(),
            positive_label: default_positive_label(),
            class_labels: default_class_labels(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Graph store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub backend: GraphBackend,
    /// Neo4j HTTP endpoint
    pub url: String,
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,
    pub username: String,
    pub password: String,
    /// HTTP request timeout in milliseconds
    #[serde(default = "default_graph_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_graph_timeout_ms() -> u64 {
    5000
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Maximum claims processed concurrently
    pub concurrency: usize,
    /// Upper bound on a single graph write in milliseconds
    pub persist_timeout_ms: u64,
    /// Interval between metrics summaries in seconds
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval_secs() -> u64 {
    30
}

impl WorkerConfig {
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }
}

/// Ingestion endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Address the HTTP endpoint binds to
    pub bind_addr: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                claim_subject: "claims.submitted".to_string(),
                stream: "CLAIMS".to_string(),
                consumer: "claim-worker".to_string(),
                dead_letter_subject: Some("claims.dead_letter".to_string()),
            },
            artifacts: ArtifactsConfig::default(),
            graph: GraphConfig {
                backend: GraphBackend::Neo4j,
                url: "http://localhost:7474".to_string(),
                database: default_database(),
                username: "neo4j".to_string(),
                password: "password".to_string(),
                timeout_ms: default_graph_timeout_ms(),
            },
            worker: WorkerConfig {
                concurrency: 4,
                persist_timeout_ms: 5000,
                metrics_interval_secs: default_metrics_interval_secs(),
            },
            ingest: IngestConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.artifacts.positive_label, "Y");
        assert_eq!(config.artifacts.class_labels, vec!["N", "Y"]);
        assert_eq!(config.graph.backend, GraphBackend::Neo4j);
        assert_eq!(config.worker.persist_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_from_path_applies_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[nats]
url = "nats://queue:4222"
claim_subject = "claims.submitted"
stream = "CLAIMS"
consumer = "claim-worker"

[artifacts]
model_path = "m.onnx"
scaler_path = "s.json"
schema_path = "c.json"

[graph]
backend = "memory"
url = "http://graph:7474"
username = "neo4j"
password = "secret"

[worker]
concurrency = 8
persist_timeout_ms = 250

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();

        assert_eq!(config.nats.dead_letter_subject, None);
        assert_eq!(config.artifacts.onnx_threads, 1);
        assert_eq!(config.artifacts.positive_label, "Y");
        assert_eq!(config.graph.backend, GraphBackend::Memory);
        assert_eq!(config.graph.database, "neo4j");
        assert_eq!(config.worker.concurrency, 8);
        assert_eq!(config.worker.metrics_interval_secs, 30);
        assert_eq!(config.ingest.bind_addr, "0.0.0.0:8000");
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load_from_path("/nonexistent/config.toml").is_err());
    }
}

//! Claim Fraud Worker Library
//!
//! Consumes insurance claims from a message queue, classifies each one with a
//! pre-trained model and records the verdict in a graph store.

pub mod config;
pub mod consumer;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod reconciler;
pub mod store;
pub mod types;
pub mod worker;

pub use config::AppConfig;
pub use consumer::ClaimConsumer;
pub use error::ClaimError;
pub use models::loader::ModelArtifacts;
pub use producer::{ClaimPublisher, DeadLetterProducer};
pub use reconciler::{reconcile, FeatureSchema, FeatureVector, Reconciler};
pub use store::VerdictStore;
pub use types::{ClaimRecord, ClaimSubmission, Verdict, VerdictRecord};
pub use worker::ClaimWorker;

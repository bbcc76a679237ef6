//! Claim Fraud Worker - Main Entry Point
//!
//! Pulls claims from JetStream, classifies them with the trained model and
//! upserts each verdict into the graph store.

use anyhow::{Context, Result};
use claim_fraud_worker::{
    config::AppConfig,
    consumer::ClaimConsumer,
    logging,
    metrics::{MetricsReporter, PipelineMetrics},
    models::loader::ModelArtifacts,
    producer::DeadLetterProducer,
    store,
    worker::ClaimWorker,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    logging::init(&config.logging, "claim_worker=info")?;
    info!("Starting Claim Fraud Worker");

    // Artifacts are required before any message is consumed
    let artifacts = Arc::new(ModelArtifacts::load(&config.artifacts)?);
    info!(
        features = artifacts.schema().len(),
        model = %artifacts.engine().model_name(),
        positive_label = %artifacts.engine().positive_label(),
        "Model artifacts ready"
    );

    let verdict_store = store::from_config(&config.graph)?;
    info!(backend = verdict_store.backend(), "Graph store initialized");

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url)
        .await
        .context(format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!(url = %config.nats.url, "Connected to NATS");

    let consumer = ClaimConsumer::new(client.clone(), &config.nats.stream, &config.nats.consumer);

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    let mut worker = ClaimWorker::new(artifacts, verdict_store, metrics.clone())
        .with_persist_timeout(config.worker.persist_timeout())
        .with_concurrency(config.worker.concurrency);

    match &config.nats.dead_letter_subject {
        Some(subject) => {
            info!(subject = %subject, "Dead letters enabled");
            worker = worker.with_dead_letters(Arc::new(DeadLetterProducer::new(client, subject)));
        }
        None => warn!("No dead-letter subject configured, failed claims are only logged"),
    }

    // Start metrics reporter
    let reporter = MetricsReporter::new(metrics.clone(), config.worker.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let deliveries = consumer.messages().await?;
    let worker = Arc::new(worker);

    tokio::select! {
        _ = worker.run(deliveries) => {
            warn!("Claim stream closed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    // Print final summary
    info!("Claim worker shutting down...");
    metrics.print_summary();

    Ok(())
}

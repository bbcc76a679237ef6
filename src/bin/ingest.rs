//! Claim ingestion endpoint
//!
//! Accepts claims over HTTP and publishes them to NATS for the claim worker.

use anyhow::{Context, Result};
use claim_fraud_worker::{config::AppConfig, ingest, logging, producer::ClaimPublisher};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.logging, "claim_ingest=info")?;

    info!("Starting Claim Ingestion Endpoint");

    let client = async_nats::connect(&config.nats.url)
        .await
        .context(format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!(url = %config.nats.url, subject = %config.nats.claim_subject, "Connected to NATS");

    let publisher = ClaimPublisher::new(client, &config.nats.claim_subject);
    let app = ingest::router(Arc::new(publisher));

    let listener = tokio::net::TcpListener::bind(&config.ingest.bind_addr)
        .await
        .context(format!("Failed to bind {}", config.ingest.bind_addr))?;
    info!(addr = %config.ingest.bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

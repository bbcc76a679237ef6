//! JetStream consumer for incoming claims

use crate::worker::ClaimDelivery;
use anyhow::{anyhow, Result};
use async_nats::jetstream::{self, consumer::PullConsumer};
use async_nats::Client;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tracing::{info, warn};

/// Consumer binding to a pre-provisioned stream and durable pull consumer
pub struct ClaimConsumer {
    jetstream: jetstream::Context,
    stream: String,
    consumer: String,
}

impl ClaimConsumer {
    /// Create a new claim consumer
    pub fn new(client: Client, stream: &str, consumer: &str) -> Self {
        Self {
            jetstream: jetstream::new(client),
            stream: stream.to_string(),
            consumer: consumer.to_string(),
        }
    }

    /// Open the delivery stream.
    ///
    /// Fails when the stream or consumer does not exist; their topology is
    /// managed outside the worker.
    pub async fn messages(&self) -> Result<impl Stream<Item = JetStreamDelivery>> {
        let stream = self
            .jetstream
            .get_stream(&self.stream)
            .await
            .map_err(|e| anyhow!("JetStream stream '{}' unavailable: {}", self.stream, e))?;

        let consumer: PullConsumer = stream
            .get_consumer(&self.consumer)
            .await
            .map_err(|e| anyhow!("Consumer '{}' unavailable: {}", self.consumer, e))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| anyhow!("Failed to open message stream: {}", e))?;

        info!(stream = %self.stream, consumer = %self.consumer, "Bound to claim consumer");

        Ok(messages.filter_map(|message| async move {
            match message {
                Ok(message) => Some(JetStreamDelivery(message)),
                Err(e) => {
                    warn!(error = %e, "Failed to receive claim message");
                    None
                }
            }
        }))
    }

    /// Get the stream name
    pub fn stream(&self) -> &str {
        &self.stream
    }
}

/// A claim message pulled from JetStream
pub struct JetStreamDelivery(jetstream::Message);

#[async_trait]
impl ClaimDelivery for JetStreamDelivery {
    fn payload(&self) -> &[u8] {
        &self.0.payload
    }

    async fn ack(&self) -> Result<()> {
        self.0
            .ack()
            .await
            .map_err(|e| anyhow!("Failed to acknowledge message: {}", e))
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}

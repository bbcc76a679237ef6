//! NATS message producers for claims and dead letters

use crate::types::claim::ClaimSubmission;
use crate::types::dead_letter::DeadLetter;
use crate::worker::DeadLetterSink;
use anyhow::Result;
use async_nats::Client;
use async_trait::async_trait;
use tracing::debug;

/// Publisher placing submitted claims onto the claim subject
#[derive(Clone)]
pub struct ClaimPublisher {
    client: Client,
    subject: String,
}

impl ClaimPublisher {
    /// Create a new claim publisher
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a claim and flush it to the server
    pub async fn publish(&self, claim: &ClaimSubmission) -> Result<()> {
        let payload = serde_json::to_vec(claim)?;
        self.publish_raw(payload).await?;

        debug!(policy_number = %claim.policy_number, "Published claim");
        Ok(())
    }

    /// Publish a payload verbatim
    pub async fn publish_raw(&self, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;
        self.client.flush().await?;
        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Producer for publishing failed claims to the dead-letter subject
#[derive(Clone)]
pub struct DeadLetterProducer {
    client: Client,
    subject: String,
}

impl DeadLetterProducer {
    /// Create a new dead-letter producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[async_trait]
impl DeadLetterSink for DeadLetterProducer {
    async fn publish(&self, letter: &DeadLetter) -> Result<()> {
        let payload = serde_json::to_vec(letter)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            letter_id = %letter.letter_id,
            claim_id = ?letter.claim_id,
            error_kind = %letter.error_kind,
            "Published dead letter"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}

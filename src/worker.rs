//! Claim worker: the per-message pipeline and the concurrent consume loop.
//!
//! Each message moves through `Received -> Reconciled -> Scaled -> Scored ->
//! Persisted -> Acknowledged`. A failure at any step ends that message in
//! `Failed`: it is logged, optionally dead-lettered, acknowledged, and the
//! loop moves on.

use crate::error::ClaimError;
use crate::metrics::PipelineMetrics;
use crate::models::loader::ModelArtifacts;
use crate::reconciler::reconcile;
use crate::store::VerdictStore;
use crate::types::claim::{peek_claim_id, ClaimRecord};
use crate::types::dead_letter::{ClaimStage, DeadLetter};
use crate::types::verdict::VerdictRecord;
use anyhow::Result;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// A message pulled from the claim queue
#[async_trait]
pub trait ClaimDelivery: Send + Sync + 'static {
    fn payload(&self) -> &[u8];

    /// Tell the transport the message is handled
    async fn ack(&self) -> Result<()>;
}

/// Destination for claims that failed processing
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn publish(&self, letter: &DeadLetter) -> Result<()>;
}

/// A pipeline run that ended in `Failed`
#[derive(Debug)]
pub struct StageFailure {
    /// Last stage reached before the failure
    pub stage: ClaimStage,
    pub claim_id: Option<String>,
    pub error: ClaimError,
}

impl StageFailure {
    fn new(stage: ClaimStage, claim_id: &str, error: ClaimError) -> Self {
        Self {
            stage,
            claim_id: Some(claim_id.to_string()),
            error,
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "claim {} failed after {}: {}",
            self.claim_id.as_deref().unwrap_or("unknown"),
            self.stage,
            self.error
        )
    }
}

/// Orchestrates reconcile, scale, infer and persist for each claim
pub struct ClaimWorker {
    artifacts: Arc<ModelArtifacts>,
    store: Arc<dyn VerdictStore>,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
    metrics: Arc<PipelineMetrics>,
    persist_timeout: Duration,
    concurrency: usize,
}

impl ClaimWorker {
    pub fn new(
        artifacts: Arc<ModelArtifacts>,
        store: Arc<dyn VerdictStore>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            artifacts,
            store,
            dead_letters: None,
            metrics,
            persist_timeout: Duration::from_secs(5),
            concurrency: 1,
        }
    }

    /// Route failed claims to `sink` instead of discarding them
    pub fn with_dead_letters(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letters = Some(sink);
        self
    }

    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    /// Maximum claims processed at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Run one payload through the pipeline up to `Persisted`
    pub async fn process(&self, payload: &[u8]) -> Result<VerdictRecord, StageFailure> {
        let record = ClaimRecord::from_slice(payload).map_err(|error| StageFailure {
            stage: ClaimStage::Received,
            claim_id: peek_claim_id(payload),
            error,
        })?;
        let claim_id = record.claim_id().ok_or_else(|| StageFailure {
            stage: ClaimStage::Received,
            claim_id: None,
            error: ClaimError::MalformedMessage("claim has no policy_number".to_string()),
        })?;

        debug!(claim_id = %claim_id, attributes = record.len(), "Processing claim");

        let vector = reconcile(&record, self.artifacts.schema())
            .map_err(|error| StageFailure::new(ClaimStage::Received, &claim_id, error))?;

        let (vector, report) = self.artifacts.scaling().apply(vector);
        self.metrics.record_scaling_skips(report.skipped());

        let verdict = self
            .artifacts
            .engine()
            .predict(&vector)
            .map_err(|error| StageFailure::new(ClaimStage::Scaled, &claim_id, error))?;

        let verdict_record = VerdictRecord::new(claim_id, verdict, record.incident_type());

        match tokio::time::timeout(self.persist_timeout, self.store.persist(&verdict_record)).await
        {
            Ok(Ok(())) => Ok(verdict_record),
            Ok(Err(error)) => Err(StageFailure::new(
                ClaimStage::Scored,
                &verdict_record.claim_id,
                error,
            )),
            Err(_) => Err(StageFailure::new(
                ClaimStage::Scored,
                &verdict_record.claim_id,
                ClaimError::Persistence(format!(
                    "{} write timed out after {:?}",
                    self.store.backend(),
                    self.persist_timeout
                )),
            )),
        }
    }

    /// Process one delivery, route a failure, and acknowledge it.
    ///
    /// Returns the final stage: `Acknowledged` on success, `Failed` when the
    /// pipeline failed, `Persisted` when the verdict was stored but the ack
    /// did not go through.
    pub async fn handle<D: ClaimDelivery>(&self, delivery: D) -> ClaimStage {
        let start_time = Instant::now();

        let stage = match self.process(delivery.payload()).await {
            Ok(record) => {
                let processing_time = start_time.elapsed();
                self.metrics.record_verdict(processing_time, record.verdict);
                info!(
                    claim_id = %record.claim_id,
                    verdict = %record.verdict,
                    incident_type = %record.incident_type,
                    processing_time_us = processing_time.as_micros(),
                    "Claim classified"
                );
                ClaimStage::Persisted
            }
            Err(failure) => {
                self.metrics.record_failure(failure.error.kind());
                error!(
                    claim_id = failure.claim_id.as_deref().unwrap_or("unknown"),
                    stage = %failure.stage,
                    error_kind = failure.error.kind(),
                    error = %failure.error,
                    "Claim processing failed"
                );
                self.route_dead_letter(&failure, delivery.payload()).await;
                ClaimStage::Failed
            }
        };

        if let Err(e) = delivery.ack().await {
            warn!(error = %e, "Acknowledgement failed, message may be redelivered");
            return stage;
        }

        match stage {
            ClaimStage::Persisted => ClaimStage::Acknowledged,
            other => other,
        }
    }

    async fn route_dead_letter(&self, failure: &StageFailure, payload: &[u8]) {
        let Some(sink) = &self.dead_letters else {
            return;
        };

        let letter = DeadLetter::new(
            failure.claim_id.clone(),
            failure.stage,
            &failure.error,
            payload,
        );
        if let Err(e) = sink.publish(&letter).await {
            error!(
                claim_id = failure.claim_id.as_deref().unwrap_or("unknown"),
                error = %e,
                "Failed to publish dead letter"
            );
        }
    }

    /// Consume deliveries until the stream ends.
    ///
    /// At most `concurrency` claims are in flight; in-flight claims are
    /// drained before returning.
    pub async fn run<S, D>(self: Arc<Self>, deliveries: S)
    where
        S: Stream<Item = D>,
        D: ClaimDelivery,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut deliveries = std::pin::pin!(deliveries);

        info!(concurrency = self.concurrency, "Claim worker started");

        while let Some(delivery) = deliveries.next().await {
            // Acquire permit (limits concurrent tasks)
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };

            let worker = Arc::clone(&self);
            tokio::spawn(async move {
                worker.handle(delivery).await;
                drop(permit);
            });
        }

        let _ = semaphore.acquire_many(self.concurrency as u32).await;
        info!("Claim stream ended");
    }
}

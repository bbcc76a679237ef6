//! HTTP ingestion endpoint
//!
//! Accepts claims over HTTP and places them on the claim queue without
//! waiting for classification.

use crate::producer::ClaimPublisher;
use crate::types::claim::ClaimSubmission;
use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Queue the endpoint hands accepted claims to
#[async_trait]
pub trait ClaimQueue: Send + Sync {
    async fn submit(&self, claim: &ClaimSubmission) -> Result<()>;
}

#[async_trait]
impl ClaimQueue for ClaimPublisher {
    async fn submit(&self, claim: &ClaimSubmission) -> Result<()> {
        self.publish(claim).await
    }
}

#[derive(Debug)]
pub enum IngestError {
    /// Body is not JSON
    BadRequest(String),
    /// Required field missing or wrongly typed
    Validation(String),
    /// Claim could not be published
    QueueUnavailable(String),
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            IngestError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            IngestError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            IngestError::QueueUnavailable(msg) => {
                error!("Claim queue error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Claim queue unavailable")
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for IngestError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => IngestError::Validation(e.body_text()),
            other => IngestError::BadRequest(other.body_text()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: &'static str,
    pub policy_number: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

#[derive(Clone)]
pub struct IngestState {
    queue: Arc<dyn ClaimQueue>,
}

/// Build the ingestion router
pub fn router(queue: Arc<dyn ClaimQueue>) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .with_state(IngestState { queue })
}

async fn analyze(
    State(state): State<IngestState>,
    payload: Result<Json<ClaimSubmission>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, IngestError> {
    let Json(claim) = payload?;
    claim.validate().map_err(IngestError::Validation)?;

    state
        .queue
        .submit(&claim)
        .await
        .map_err(|e| IngestError::QueueUnavailable(format!("{:#}", e)))?;

    info!(policy_number = %claim.policy_number, "Claim accepted");

    Ok(Json(AnalyzeResponse {
        status: "success",
        message: format!("Claim {} is being processed by AI", claim.policy_number),
        policy_number: claim.policy_number,
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingQueue {
        claims: Mutex<Vec<ClaimSubmission>>,
    }

    #[async_trait]
    impl ClaimQueue for RecordingQueue {
        async fn submit(&self, claim: &ClaimSubmission) -> Result<()> {
            self.claims.lock().unwrap().push(claim.clone());
            Ok(())
        }
    }

    struct DownQueue;

    #[async_trait]
    impl ClaimQueue for DownQueue {
        async fn submit(&self, _claim: &ClaimSubmission) -> Result<()> {
            anyhow::bail!("no servers available for connection")
        }
    }

    fn claim_body() -> String {
        serde_json::to_string(
            &ClaimSubmission::new("521585".to_string()).with_category("incident_type", "Theft"),
        )
        .unwrap()
    }

    fn analyze_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_publishes_claim() {
        let queue = Arc::new(RecordingQueue::default());
        let app = router(queue.clone());

        let response = app.oneshot(analyze_request(claim_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["policy_number"], "521585");
        assert_eq!(body["message"], "Claim 521585 is being processed by AI");

        let claims = queue.claims.lock().unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].categorical["incident_type"], "Theft");
    }

    #[tokio::test]
    async fn test_missing_required_field_is_unprocessable() {
        let queue = Arc::new(RecordingQueue::default());
        let app = router(queue.clone());

        let response = app
            .oneshot(analyze_request(
                r#"{"policy_number": "1", "months_as_customer": 10}"#.to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(queue.claims.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nested_attribute_is_unprocessable() {
        let mut value: serde_json::Value = serde_json::from_str(&claim_body()).unwrap();
        value["collision_type"] = json!({"front": true});
        let app = router(Arc::new(RecordingQueue::default()));

        let response = app.oneshot(analyze_request(value.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("collision_type"));
    }

    #[tokio::test]
    async fn test_unreachable_queue_is_bad_gateway() {
        let app = router(Arc::new(DownQueue));

        let response = app.oneshot(analyze_request(claim_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["status"], 502);
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(Arc::new(RecordingQueue::default()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }
}

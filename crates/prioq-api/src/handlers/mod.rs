//! HTTP API handlers — maps engine operations and errors onto JSON.

pub mod status;
pub mod topics;

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use prioq_core::{ErrorKind, QueueError};
use prioq_services::QueueEngine;
use serde::Serialize;

#[derive(Clone)]
pub struct ApiState {
    pub engine: QueueEngine,
    /// Echoed in enqueue replies so producers can tell nodes apart.
    pub node_id: String,
    pub started_at: Instant,
    /// Shutdown broadcast sender — signals graceful daemon shutdown.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

impl ApiState {
    pub fn new(
        engine: QueueEngine,
        node_id: impl Into<String>,
        shutdown_tx: tokio::sync::broadcast::Sender<()>,
    ) -> Self {
        Self {
            engine,
            node_id: node_id.into(),
            started_at: Instant::now(),
            shutdown_tx,
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
}

/// Every handler failure. Queue errors keep their kind on the wire;
/// malformed requests that never reach the engine read as invalid arguments.
#[derive(Debug)]
pub enum ApiError {
    Queue(QueueError),
    BadRequest(String),
    /// Request body over the route's `DefaultBodyLimit`.
    BodyTooLarge(String),
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        ApiError::Queue(e)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::QueueFull => StatusCode::TOO_MANY_REQUESTS,
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BodyTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (kind, error) = match self {
            ApiError::Queue(e) => (e.kind(), e.to_string()),
            ApiError::BadRequest(msg) => (ErrorKind::InvalidArgument, msg),
            ApiError::BodyTooLarge(msg) => (ErrorKind::PayloadTooLarge, msg),
        };
        (status_for(kind), Json(ErrorBody { error, kind })).into_response()
    }
}

// ── Extractors ────────────────────────────────────────────────────────────────

/// `Json` whose rejections come back as `{error, kind}` like every other
/// failure, instead of axum's plain-text 4xx.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Decode a hex-encoded payload. An empty string is an empty payload.
fn parse_payload(hex_str: &str) -> Result<bytes::Bytes, ApiError> {
    hex::decode(hex_str)
        .map(bytes::Bytes::from)
        .map_err(|e| ApiError::BadRequest(format!("payload is not valid hex: {e}")))
}

// Re-export handler functions for use in router setup.
pub use status::{handle_shutdown, handle_status};
pub use topics::{
    handle_ack, handle_dequeue, handle_enqueue, handle_nack, handle_topic_stats, handle_topics,
};

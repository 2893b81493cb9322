//! Error taxonomy surfaced by the queue engine.
//!
//! Every variant is detected before any queue state changes. None of them
//! is retried internally; the caller decides.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Empty topic, non-positive count, or priority outside the allowed range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Topic already holds its configured maximum of resident messages.
    #[error("topic '{topic}' is full ({limit} resident messages)")]
    QueueFull { topic: String, limit: usize },

    #[error("{0} not found")]
    NotFound(String),
}

/// Stable discriminant for mapping errors onto wire status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    PayloadTooLarge,
    QueueFull,
    NotFound,
}

impl QueueError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        QueueError::InvalidArgument(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            QueueError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            QueueError::QueueFull { .. } => ErrorKind::QueueFull,
            QueueError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;

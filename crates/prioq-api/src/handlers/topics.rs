//! /topics handlers — enqueue, dequeue, ack, nack and per-topic stats.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::Json;
use prioq_core::Message;
use prioq_services::{DequeueOptions, EnqueueOptions, TopicStats};
use serde::{Deserialize, Serialize};

use super::{parse_payload, ApiError, ApiJson, ApiState};

// ── /topics/{topic}/enqueue (POST) ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct EnqueueRequest {
    #[serde(default)]
    pub meta: String,
    /// Hex-encoded bytes.
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub deliver_after_ms: u64,
}

#[derive(Serialize)]
pub struct EnqueueResponse {
    pub message_id: u64,
    pub node_id: String,
}

pub async fn handle_enqueue(
    State(state): State<ApiState>,
    Path(topic): Path<String>,
    ApiJson(req): ApiJson<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    let payload = parse_payload(&req.payload)?;
    let priority = i32::try_from(req.priority)
        .map_err(|_| ApiError::BadRequest(format!("priority {} out of range", req.priority)))?;
    let opts = EnqueueOptions {
        deliver_after: Duration::from_millis(req.deliver_after_ms),
    };

    let message_id = state
        .engine
        .enqueue_with(&topic, req.meta, payload, priority, opts)?;

    Ok(Json(EnqueueResponse {
        message_id,
        node_id: state.node_id.clone(),
    }))
}

// ── /topics/{topic}/dequeue (POST) ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DequeueRequest {
    #[serde(default = "default_count")]
    pub count: i64,
    #[serde(default)]
    pub lease_ms: u64,
}

fn default_count() -> i64 {
    1
}

#[derive(Serialize)]
pub struct DequeueResponse {
    pub items: Vec<ItemJson>,
}

#[derive(Serialize)]
pub struct ItemJson {
    pub message_id: u64,
    pub meta: String,
    pub payload: String,
    pub priority: i32,
}

impl From<Message> for ItemJson {
    fn from(m: Message) -> Self {
        Self {
            message_id: m.id(),
            meta: m.meta().to_string(),
            payload: hex::encode(m.payload()),
            priority: m.priority(),
        }
    }
}

pub async fn handle_dequeue(
    State(state): State<ApiState>,
    Path(topic): Path<String>,
    ApiJson(req): ApiJson<DequeueRequest>,
) -> Result<Json<DequeueResponse>, ApiError> {
    let opts = DequeueOptions {
        lease: Duration::from_millis(req.lease_ms),
    };
    let batch = state.engine.dequeue_with(&topic, req.count, opts)?;

    Ok(Json(DequeueResponse {
        items: batch.into_iter().map(ItemJson::from).collect(),
    }))
}

// ── /topics/{topic}/ack, /topics/{topic}/nack (POST) ──────────────────────────

#[derive(Deserialize)]
pub struct AckRequest {
    pub message_id: u64,
}

#[derive(Deserialize)]
pub struct NackRequest {
    pub message_id: u64,
    /// Replaces the message's meta when present and non-empty.
    #[serde(default)]
    pub meta: Option<String>,
    #[serde(default)]
    pub deliver_after_ms: u64,
}

#[derive(Serialize)]
pub struct SettleResponse {}

pub async fn handle_ack(
    State(state): State<ApiState>,
    Path(topic): Path<String>,
    ApiJson(req): ApiJson<AckRequest>,
) -> Result<Json<SettleResponse>, ApiError> {
    state.engine.ack(&topic, req.message_id)?;
    Ok(Json(SettleResponse {}))
}

pub async fn handle_nack(
    State(state): State<ApiState>,
    Path(topic): Path<String>,
    ApiJson(req): ApiJson<NackRequest>,
) -> Result<Json<SettleResponse>, ApiError> {
    let meta = req.meta.filter(|m| !m.is_empty());
    state.engine.nack(
        &topic,
        req.message_id,
        meta,
        Duration::from_millis(req.deliver_after_ms),
    )?;
    Ok(Json(SettleResponse {}))
}

// ── /topics, /topics/{topic} (GET) ────────────────────────────────────────────

#[derive(Serialize)]
pub struct TopicsResponse {
    pub topics: Vec<TopicStats>,
}

pub async fn handle_topics(State(state): State<ApiState>) -> Json<TopicsResponse> {
    Json(TopicsResponse {
        topics: state.engine.active_topics(),
    })
}

pub async fn handle_topic_stats(
    State(state): State<ApiState>,
    Path(topic): Path<String>,
) -> Result<Json<TopicStats>, ApiError> {
    Ok(Json(state.engine.topic_stats(&topic)?))
}

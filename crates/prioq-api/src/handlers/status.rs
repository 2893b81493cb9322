//! /status and /daemon/shutdown handlers.

use axum::extract::State;
use axum::Json;
use prioq_services::CounterSnapshot;
use serde::Serialize;

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub node_id: String,
    pub topics: usize,
    pub uptime_secs: u64,
    pub counters: CounterSnapshot,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        node_id: state.node_id.clone(),
        topics: state.engine.registry().len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        counters: state.engine.counters(),
    })
}

// ── /daemon/shutdown ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    let _ = state.shutdown_tx.send(());

    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}

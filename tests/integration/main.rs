//! prioq integration test harness.
//!
//! Everything here runs in-process: engines are built directly, and the
//! HTTP tests bind an ephemeral loopback port per test, so tests never
//! share state and can run in parallel.
//!
//!   cargo test --test integration

use std::collections::HashSet;

use prioq_core::config::QueueLimits;
use prioq_core::Message;
use prioq_services::QueueEngine;

mod concurrency;
mod scenarios;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Engine with default (unbounded) limits.
pub fn engine() -> QueueEngine {
    QueueEngine::new(QueueLimits::default())
}

/// Engine with every limit set; 0 leaves that limit off.
pub fn bounded_engine(max_payload: usize, max_resident: usize, max_priority: i32) -> QueueEngine {
    QueueEngine::new(QueueLimits {
        max_payload_bytes: max_payload,
        max_resident_per_topic: max_resident,
        max_priority,
        ..QueueLimits::default()
    })
}

/// Drain `topic` one message at a time until a dequeue comes back empty.
pub fn drain(engine: &QueueEngine, topic: &str) -> Vec<Message> {
    let mut out = Vec::new();
    loop {
        let batch = engine.dequeue(topic, 1).expect("dequeue failed");
        if batch.is_empty() {
            return out;
        }
        out.extend(batch);
    }
}

pub fn ids(messages: &[Message]) -> Vec<u64> {
    messages.iter().map(Message::id).collect()
}

pub fn metas(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(Message::meta).collect()
}

/// Panics if any id appears twice.
pub fn assert_unique(ids: &[u64]) {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        assert!(seen.insert(*id), "message {id} delivered twice");
    }
}

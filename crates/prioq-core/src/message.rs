//! Message record held by a topic queue.
//!
//! A message is created once, at enqueue time, and never mutated. The only
//! thing that changes over its life is where it lives: a lane, the delayed
//! set, a lease, or the caller's hands after a dequeue.

use bytes::Bytes;

/// One enqueued item.
///
/// Lower `priority` values are more urgent. Within a priority, `id` order
/// is arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: u64,
    meta: String,
    payload: Bytes,
    priority: i32,
    enqueue_time: u64,
}

impl Message {
    pub fn new(
        id: u64,
        meta: impl Into<String>,
        payload: impl Into<Bytes>,
        priority: i32,
        enqueue_time: u64,
    ) -> Self {
        Self {
            id,
            meta: meta.into(),
            payload: payload.into(),
            priority,
            enqueue_time,
        }
    }

    /// Per-topic sequence number. Never reused.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Producer-supplied tag. Opaque to the queue.
    pub fn meta(&self) -> &str {
        &self.meta
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Unix ms at which the message was first accepted.
    pub fn enqueue_time(&self) -> u64 {
        self.enqueue_time
    }

    /// Same message under a different tag. Used when a consumer rejects a
    /// delivery and annotates it on the way back.
    pub fn with_meta(self, meta: impl Into<String>) -> Self {
        Self {
            meta: meta.into(),
            ..self
        }
    }
}

//! Queue engine — the operation surface the service boundary calls.
//!
//! Validates arguments, applies the configured limits, resolves topics
//! through the registry and delegates to the per-topic queue. The engine
//! owns no queue state of its own beyond counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use prioq_core::config::QueueLimits;
use prioq_core::error::Result;
use prioq_core::time::now_ms;
use prioq_core::{Message, QueueError};
use serde::Serialize;

use crate::lane_queue::{Released, TopicStats};
use crate::registry::TopicRegistry;

/// Running totals since the engine was built.
#[derive(Debug, Default)]
struct EngineCounters {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    acked: AtomicU64,
    nacked: AtomicU64,
    rejected: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub enqueued: u64,
    pub dequeued: u64,
    pub acked: u64,
    pub nacked: u64,
    pub rejected: u64,
}

/// Enqueue arguments beyond topic, meta, payload and priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    /// Keep the message invisible for this long.
    pub deliver_after: Duration,
}

/// Dequeue arguments beyond topic and count.
#[derive(Debug, Clone, Copy, Default)]
pub struct DequeueOptions {
    /// Zero means a destructive read. Otherwise returned messages come back
    /// unless acked within this window.
    pub lease: Duration,
}

#[derive(Clone)]
pub struct QueueEngine {
    registry: TopicRegistry,
    limits: Arc<QueueLimits>,
    counters: Arc<EngineCounters>,
}

impl Default for QueueEngine {
    fn default() -> Self {
        Self::new(QueueLimits::default())
    }
}

impl QueueEngine {
    pub fn new(limits: QueueLimits) -> Self {
        let registry = TopicRegistry::with_resident_limit(limits.resident_limit());
        Self {
            registry,
            limits: Arc::new(limits),
            counters: Arc::new(EngineCounters::default()),
        }
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    // ── Enqueue ───────────────────────────────────────────────────────────────

    /// Add a message to `topic`, creating the topic on first use.
    pub fn enqueue(
        &self,
        topic: &str,
        meta: impl Into<String>,
        payload: impl Into<Bytes>,
        priority: i32,
    ) -> Result<u64> {
        self.enqueue_with(topic, meta, payload, priority, EnqueueOptions::default())
    }

    pub fn enqueue_with(
        &self,
        topic: &str,
        meta: impl Into<String>,
        payload: impl Into<Bytes>,
        priority: i32,
        opts: EnqueueOptions,
    ) -> Result<u64> {
        self.enqueue_at(topic, meta.into(), payload.into(), priority, opts, now_ms())
    }

    /// Enqueue with an explicit clock reading.
    pub fn enqueue_at(
        &self,
        topic: &str,
        meta: String,
        payload: Bytes,
        priority: i32,
        opts: EnqueueOptions,
        now: u64,
    ) -> Result<u64> {
        let result = self.check_enqueue(topic, &payload, priority).and_then(|()| {
            self.registry.get_or_create(topic)?.push_at(
                priority,
                meta,
                payload,
                opts.deliver_after.as_millis() as u64,
                now,
            )
        });
        self.tally(&result, &self.counters.enqueued, |_| 1);
        result
    }

    fn check_enqueue(&self, topic: &str, payload: &Bytes, priority: i32) -> Result<()> {
        if topic.is_empty() {
            return Err(QueueError::invalid("topic name is empty"));
        }
        if priority < 0 || priority > self.limits.max_priority {
            return Err(QueueError::invalid(format!(
                "priority {priority} outside 0..={}",
                self.limits.max_priority
            )));
        }
        if let Some(limit) = self.limits.payload_limit() {
            if payload.len() > limit {
                return Err(QueueError::PayloadTooLarge {
                    size: payload.len(),
                    limit,
                });
            }
        }
        Ok(())
    }

    // ── Dequeue ───────────────────────────────────────────────────────────────

    /// Take up to `count` messages from `topic`, most urgent first.
    ///
    /// An unknown topic reads as empty: a polling consumer can't act on the
    /// difference. Use `topic_stats` when the distinction matters.
    pub fn dequeue(&self, topic: &str, count: i64) -> Result<Vec<Message>> {
        self.dequeue_with(topic, count, DequeueOptions::default())
    }

    pub fn dequeue_with(
        &self,
        topic: &str,
        count: i64,
        opts: DequeueOptions,
    ) -> Result<Vec<Message>> {
        self.dequeue_at(topic, count, opts, now_ms())
    }

    /// Dequeue with an explicit clock reading.
    pub fn dequeue_at(
        &self,
        topic: &str,
        count: i64,
        opts: DequeueOptions,
        now: u64,
    ) -> Result<Vec<Message>> {
        let result = self.check_dequeue(topic, count).map(|max| {
            match self.registry.get(topic) {
                Ok(queue) => queue.pop_batch_at(max, opts.lease.as_millis() as u64, now),
                Err(_) => Vec::new(),
            }
        });
        self.tally(&result, &self.counters.dequeued, |batch| batch.len() as u64);
        result
    }

    fn check_dequeue(&self, topic: &str, count: i64) -> Result<usize> {
        if topic.is_empty() {
            return Err(QueueError::invalid("topic name is empty"));
        }
        if count <= 0 {
            return Err(QueueError::invalid(format!(
                "count must be positive, got {count}"
            )));
        }
        let requested = usize::try_from(count).unwrap_or(usize::MAX);
        Ok(self.limits.clamp_batch(requested))
    }

    // ── Leases ────────────────────────────────────────────────────────────────

    /// Settle a message delivered under a lease.
    pub fn ack(&self, topic: &str, id: u64) -> Result<()> {
        self.ack_at(topic, id, now_ms())
    }

    pub fn ack_at(&self, topic: &str, id: u64, now: u64) -> Result<()> {
        let result = self
            .registry
            .get(topic)
            .and_then(|queue| queue.ack_at(id, now));
        self.tally(&result, &self.counters.acked, |_| 1);
        result
    }

    /// Return a leased message to its topic, optionally retagged and delayed.
    pub fn nack(
        &self,
        topic: &str,
        id: u64,
        meta: Option<String>,
        deliver_after: Duration,
    ) -> Result<()> {
        self.nack_at(topic, id, meta, deliver_after, now_ms())
    }

    pub fn nack_at(
        &self,
        topic: &str,
        id: u64,
        meta: Option<String>,
        deliver_after: Duration,
        now: u64,
    ) -> Result<()> {
        let result = self.registry.get(topic).and_then(|queue| {
            queue.nack_at(id, meta, deliver_after.as_millis() as u64, now)
        });
        self.tally(&result, &self.counters.nacked, |_| 1);
        result
    }

    // ── Introspection ─────────────────────────────────────────────────────────

    /// Stats for one topic. Unlike `dequeue`, an unknown topic is `NotFound`.
    pub fn topic_stats(&self, topic: &str) -> Result<TopicStats> {
        self.registry.get(topic).map(|queue| queue.stats())
    }

    /// Stats for every topic, sorted by name.
    pub fn active_topics(&self) -> Vec<TopicStats> {
        self.registry.queues().iter().map(|q| q.stats()).collect()
    }

    pub fn counters(&self) -> CounterSnapshot {
        let c = &self.counters;
        CounterSnapshot {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            dequeued: c.dequeued.load(Ordering::Relaxed),
            acked: c.acked.load(Ordering::Relaxed),
            nacked: c.nacked.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
        }
    }

    // ── Maintenance ───────────────────────────────────────────────────────────

    /// Promote due delayed messages and expire leases on every topic.
    pub fn sweep(&self) -> Released {
        self.sweep_at(now_ms())
    }

    pub fn sweep_at(&self, now: u64) -> Released {
        self.registry
            .queues()
            .iter()
            .map(|q| q.sweep(now))
            .fold(Released::default(), |acc, r| Released {
                promoted: acc.promoted + r.promoted,
                expired: acc.expired + r.expired,
            })
    }

    fn tally<T>(&self, result: &Result<T>, counter: &AtomicU64, amount: impl Fn(&T) -> u64) {
        match result {
            Ok(value) => {
                counter.fetch_add(amount(value), Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(error = %e, kind = ?e.kind(), "request rejected");
            }
        }
    }
}

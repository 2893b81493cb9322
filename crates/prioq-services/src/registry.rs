//! Topic registry — maps topic names to their queues.
//!
//! Topics are created on first enqueue and live for the lifetime of the
//! registry. The map is sharded (DashMap), so steady-state traffic on one
//! topic never waits on another; the shard lock is held only long enough
//! to clone the queue's Arc out.

use std::sync::Arc;

use dashmap::DashMap;
use prioq_core::error::Result;
use prioq_core::QueueError;

use crate::lane_queue::PriorityLaneQueue;

#[derive(Clone, Default)]
pub struct TopicRegistry {
    topics: Arc<DashMap<String, Arc<PriorityLaneQueue>>>,
    resident_limit: Option<usize>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose topics each cap resident messages at `limit`.
    pub fn with_resident_limit(limit: Option<usize>) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            resident_limit: limit,
        }
    }

    /// Return the queue for `topic`, creating it if this is the first touch.
    ///
    /// Concurrent first touches of the same name all get the same instance.
    pub fn get_or_create(&self, topic: &str) -> Result<Arc<PriorityLaneQueue>> {
        if topic.is_empty() {
            return Err(QueueError::invalid("topic name is empty"));
        }
        if let Some(queue) = self.topics.get(topic) {
            return Ok(queue.value().clone());
        }

        let mut created = false;
        let queue = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| {
                created = true;
                Arc::new(PriorityLaneQueue::with_resident_limit(
                    topic,
                    self.resident_limit,
                ))
            })
            .value()
            .clone();

        if created {
            tracing::info!(topic, "topic created");
        }
        Ok(queue)
    }

    /// Look up an existing topic. Never creates one.
    pub fn get(&self, topic: &str) -> Result<Arc<PriorityLaneQueue>> {
        self.topics
            .get(topic)
            .map(|q| q.value().clone())
            .ok_or_else(|| QueueError::NotFound(format!("topic '{topic}'")))
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Snapshot of all queues, sorted by topic name.
    pub fn queues(&self) -> Vec<Arc<PriorityLaneQueue>> {
        let mut queues: Vec<_> = self.topics.iter().map(|e| e.value().clone()).collect();
        queues.sort_by(|a, b| a.topic().cmp(b.topic()));
        queues
    }
}

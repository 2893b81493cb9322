//! Per-topic priority queue.
//!
//! Messages live in one FIFO lane per priority value. Lanes are kept in a
//! sparse ordered map, so a batch pop walks only the non-empty lanes from
//! most urgent (lowest value) to least urgent. Push is O(log L) for L live
//! lanes, pop is O(k + log L) for k returned messages, independent of depth.
//!
//! Besides the lanes a topic holds two side tables:
//!   delayed — accepted but not yet visible, keyed by (due_ms, id)
//!   leases  — handed out but not yet acked, keyed by (deadline_ms, id)
//!
//! Both are drained back into the lanes lazily at the start of every
//! mutation and by `sweep`. Every message in a lane is ordered by id, so a
//! message coming back from either table slots in where its id belongs.
//! That slot-in shifts the lane, so it is the one path whose cost grows
//! with lane depth.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use prioq_core::error::Result;
use prioq_core::time::now_ms;
use prioq_core::{Message, QueueError};
use serde::Serialize;

/// Point-in-time view of one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicStats {
    pub topic: String,
    /// Visible messages, i.e. the depth.
    pub ready: usize,
    /// Accepted but waiting for their delivery time.
    pub delayed: usize,
    /// Delivered under a lease and not yet acked.
    pub leased: usize,
    /// Number of non-empty priority lanes.
    pub lanes: usize,
    /// Highest id handed out so far. 0 = nothing enqueued yet.
    pub last_id: u64,
    /// Messages re-queued because their lease ran out.
    pub redelivered: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    /// Delayed messages that became visible.
    pub promoted: usize,
    /// Leased messages put back because the consumer never acked.
    pub expired: usize,
}

impl Released {
    pub fn total(&self) -> usize {
        self.promoted + self.expired
    }
}

#[derive(Default)]
struct LaneState {
    lanes: BTreeMap<i32, VecDeque<Message>>,
    ready: usize,
    last_id: u64,
    delayed: BTreeMap<(u64, u64), Message>,
    leases: BTreeMap<(u64, u64), Message>,
    // id -> lease deadline, to find a lease by id on ack/nack
    lease_index: HashMap<u64, u64>,
    redelivered: u64,
}

impl LaneState {
    fn resident(&self) -> usize {
        self.ready + self.delayed.len() + self.leases.len()
    }

    /// Appending is O(1). A message older than the lane's tail (a promoted
    /// delay or a returned lease) is placed by id: O(log n) to find the slot,
    /// then up to O(n) in the lane length to shift it in.
    fn insert_ready(&mut self, msg: Message) {
        let lane = self.lanes.entry(msg.priority()).or_default();
        match lane.back() {
            Some(last) if last.id() > msg.id() => {
                let pos = lane.partition_point(|m| m.id() < msg.id());
                lane.insert(pos, msg);
            }
            _ => lane.push_back(msg),
        }
        self.ready += 1;
    }

    /// Move due delayed messages and expired leases back into their lanes.
    /// Each one costs an `insert_ready`, so mass lease expiry on a deep lane
    /// is linear in that lane's length per message.
    fn release_due(&mut self, now: u64) -> Released {
        let mut released = Released::default();

        while let Some(entry) = self.delayed.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let msg = entry.remove();
            self.insert_ready(msg);
            released.promoted += 1;
        }

        while let Some(entry) = self.leases.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let ((_, id), msg) = entry.remove_entry();
            self.lease_index.remove(&id);
            self.insert_ready(msg);
            released.expired += 1;
        }

        self.redelivered += released.expired as u64;
        released
    }

    fn take(&mut self, max: usize) -> Vec<Message> {
        let mut out = Vec::with_capacity(max.min(self.ready));
        while out.len() < max {
            let Some(mut entry) = self.lanes.first_entry() else {
                break;
            };
            let lane = entry.get_mut();
            let n = (max - out.len()).min(lane.len());
            out.extend(lane.drain(..n));
            if lane.is_empty() {
                entry.remove();
            }
        }
        self.ready -= out.len();
        out
    }

    fn take_lease(&mut self, id: u64) -> Option<Message> {
        let deadline = self.lease_index.remove(&id)?;
        self.leases.remove(&(deadline, id))
    }
}

/// Priority queue for a single topic.
///
/// All mutation happens under one mutex per topic; nothing here blocks on
/// I/O, so critical sections are short. `size` reads a mirrored atomic and
/// never takes the lock.
pub struct PriorityLaneQueue {
    topic: String,
    resident_limit: Option<usize>,
    state: Mutex<LaneState>,
    depth: AtomicUsize,
}

impl PriorityLaneQueue {
    pub fn new(topic: impl Into<String>) -> Self {
        Self::with_resident_limit(topic, None)
    }

    /// A queue that refuses new messages once it holds `limit` of them.
    pub fn with_resident_limit(topic: impl Into<String>, limit: Option<usize>) -> Self {
        Self {
            topic: topic.into(),
            resident_limit: limit,
            state: Mutex::new(LaneState::default()),
            depth: AtomicUsize::new(0),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    // ── Push ──────────────────────────────────────────────────────────────────

    /// Append a message to the lane for `priority`. Returns its id.
    pub fn push(
        &self,
        priority: i32,
        meta: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Result<u64> {
        self.push_at(priority, meta.into(), payload.into(), 0, now_ms())
    }

    /// Push with an explicit clock reading.
    pub fn push_at(
        &self,
        priority: i32,
        meta: String,
        payload: Bytes,
        delay_ms: u64,
        now: u64,
    ) -> Result<u64> {
        if priority < 0 {
            return Err(QueueError::invalid(format!(
                "priority {priority} is negative"
            )));
        }

        let mut state = self.lock();
        self.release(&mut state, now);

        if let Some(limit) = self.resident_limit {
            if state.resident() >= limit {
                return Err(QueueError::QueueFull {
                    topic: self.topic.clone(),
                    limit,
                });
            }
        }

        state.last_id += 1;
        let id = state.last_id;
        let msg = Message::new(id, meta, payload, priority, now);
        if delay_ms == 0 {
            state.insert_ready(msg);
        } else {
            state.delayed.insert((now.saturating_add(delay_ms), id), msg);
        }

        self.publish_depth(&state);
        Ok(id)
    }

    // ── Pop ───────────────────────────────────────────────────────────────────

    /// Remove and return up to `max` messages, most urgent first.
    ///
    /// An empty queue yields an empty vec. Each message is handed to exactly
    /// one caller.
    pub fn pop_batch(&self, max: usize) -> Vec<Message> {
        self.pop_batch_at(max, 0, now_ms())
    }

    /// Pop with an explicit clock reading. `lease_ms == 0` is a destructive read.
    pub fn pop_batch_at(&self, max: usize, lease_ms: u64, now: u64) -> Vec<Message> {
        if max == 0 {
            return Vec::new();
        }
        let mut state = self.lock();
        self.release(&mut state, now);

        let batch = state.take(max);
        if lease_ms > 0 {
            let deadline = now.saturating_add(lease_ms);
            for msg in &batch {
                state.leases.insert((deadline, msg.id()), msg.clone());
                state.lease_index.insert(msg.id(), deadline);
            }
        }

        self.publish_depth(&state);
        batch
    }

    // ── Leases ────────────────────────────────────────────────────────────────

    /// Settle a leased message for good.
    pub fn ack(&self, id: u64) -> Result<()> {
        self.ack_at(id, now_ms())
    }

    pub fn ack_at(&self, id: u64, now: u64) -> Result<()> {
        let mut state = self.lock();
        self.release(&mut state, now);
        let settled = state.take_lease(id);
        self.publish_depth(&state);
        settled
            .map(|_| ())
            .ok_or_else(|| self.lease_not_found(id))
    }

    /// Hand a leased message back. It keeps its id and priority; `meta`
    /// replaces the tag when given, and `delay_ms` postpones redelivery.
    pub fn nack_at(&self, id: u64, meta: Option<String>, delay_ms: u64, now: u64) -> Result<()> {
        let mut state = self.lock();
        self.release(&mut state, now);

        let Some(msg) = state.take_lease(id) else {
            return Err(self.lease_not_found(id));
        };
        let msg = match meta {
            Some(meta) => msg.with_meta(meta),
            None => msg,
        };
        if delay_ms == 0 {
            state.insert_ready(msg);
        } else {
            state.delayed.insert((now.saturating_add(delay_ms), id), msg);
        }

        self.publish_depth(&state);
        Ok(())
    }

    // ── Maintenance & introspection ───────────────────────────────────────────

    /// Promote due delayed messages and re-queue expired leases.
    pub fn sweep(&self, now: u64) -> Released {
        let mut state = self.lock();
        let released = self.release(&mut state, now);
        self.publish_depth(&state);
        released
    }

    /// Visible message count. Lock-free and possibly stale.
    pub fn size(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn stats(&self) -> TopicStats {
        let state = self.lock();
        TopicStats {
            topic: self.topic.clone(),
            ready: state.ready,
            delayed: state.delayed.len(),
            leased: state.leases.len(),
            lanes: state.lanes.len(),
            last_id: state.last_id,
            redelivered: state.redelivered,
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    // Every critical section leaves LaneState consistent before anything
    // that can panic, so a poisoned lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, LaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, state: &mut LaneState, now: u64) -> Released {
        let released = state.release_due(now);
        if released.expired > 0 {
            tracing::debug!(
                topic = %self.topic,
                expired = released.expired,
                "lease expired, messages re-queued"
            );
        }
        released
    }

    fn publish_depth(&self, state: &LaneState) {
        self.depth.store(state.ready, Ordering::Relaxed);
    }

    fn lease_not_found(&self, id: u64) -> QueueError {
        QueueError::NotFound(format!("lease for message {id} in topic '{}'", self.topic))
    }
}

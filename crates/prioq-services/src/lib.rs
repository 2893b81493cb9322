//! prioq-services — topic queues, the registry that owns them, and the
//! engine that fronts both.

pub mod engine;
pub mod lane_queue;
pub mod registry;
pub mod sweeper;

pub use engine::{CounterSnapshot, DequeueOptions, EnqueueOptions, QueueEngine};
pub use lane_queue::{PriorityLaneQueue, Released, TopicStats};
pub use registry::TopicRegistry;

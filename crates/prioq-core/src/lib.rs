//! prioq-core — message type, error taxonomy, and configuration.
//! All other prioq crates depend on this one.

pub mod config;
pub mod error;
pub mod message;
pub mod time;

pub use error::{ErrorKind, QueueError};
pub use message::Message;

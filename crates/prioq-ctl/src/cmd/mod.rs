//! CLI command modules.

pub mod consume;
pub mod http;
pub mod produce;
pub mod topics;

//! Configuration system for prioq.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $PRIOQ_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/prioq/config.toml
//!   3. ~/.config/prioq/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioqConfig {
    pub node: NodeConfig,
    pub api: ApiConfig,
    pub queue: QueueLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Identifier echoed back to producers in enqueue replies.
    pub node_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub listen_addr: String,
    pub port: u16,
    /// Request body cap for the HTTP boundary.
    pub max_body_bytes: usize,
}

/// Policy knobs consumed by the queue engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueLimits {
    /// Max payload bytes per message. 0 = unlimited.
    pub max_payload_bytes: usize,
    /// Max messages held per topic (ready + delayed + leased). 0 = unlimited.
    pub max_resident_per_topic: usize,
    /// Highest accepted priority value, inclusive.
    pub max_priority: i32,
    /// Dequeue requests above this are clamped. 0 = unlimited.
    pub max_dequeue_batch: usize,
    /// How often the daemon promotes delayed messages and expires leases.
    pub sweep_interval_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "1".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            port: 8404,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

impl Default for QueueLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: 0,
            max_resident_per_topic: 0,
            max_priority: i32::MAX,
            max_dequeue_batch: 0,
            sweep_interval_ms: 5,
        }
    }
}

impl QueueLimits {
    pub fn payload_limit(&self) -> Option<usize> {
        (self.max_payload_bytes > 0).then_some(self.max_payload_bytes)
    }

    pub fn resident_limit(&self) -> Option<usize> {
        (self.max_resident_per_topic > 0).then_some(self.max_resident_per_topic)
    }

    /// Clamp a requested batch size to the configured maximum.
    pub fn clamp_batch(&self, requested: usize) -> usize {
        if self.max_dequeue_batch == 0 {
            requested
        } else {
            requested.min(self.max_dequeue_batch)
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("prioq")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl PrioqConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            Self::parse(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            PrioqConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults with PRIOQ_* overrides applied. Used when the file is unusable,
    /// so the environment still wins.
    pub fn defaults_with_env() -> Self {
        Self::defaults_with(|key| std::env::var(key).ok())
    }

    pub fn defaults_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = PrioqConfig::default();
        config.apply_env_overrides(lookup);
        config
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PRIOQ_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&PrioqConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply PRIOQ_* overrides. Unparseable numbers are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("PRIOQ_NODE__NODE_ID") {
            self.node.node_id = v;
        }
        if let Some(v) = lookup("PRIOQ_API__LISTEN_ADDR") {
            self.api.listen_addr = v;
        }
        if let Some(p) = lookup("PRIOQ_API__PORT").and_then(|v| v.parse().ok()) {
            self.api.port = p;
        }
        if let Some(n) = lookup("PRIOQ_QUEUE__MAX_PAYLOAD_BYTES").and_then(|v| v.parse().ok()) {
            self.queue.max_payload_bytes = n;
        }
        if let Some(n) = lookup("PRIOQ_QUEUE__MAX_RESIDENT_PER_TOPIC").and_then(|v| v.parse().ok())
        {
            self.queue.max_resident_per_topic = n;
        }
        if let Some(n) = lookup("PRIOQ_QUEUE__MAX_PRIORITY").and_then(|v| v.parse().ok()) {
            self.queue.max_priority = n;
        }
        if let Some(n) = lookup("PRIOQ_QUEUE__MAX_DEQUEUE_BATCH").and_then(|v| v.parse().ok()) {
            self.queue.max_dequeue_batch = n;
        }
        if let Some(n) = lookup("PRIOQ_QUEUE__SWEEP_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.queue.sweep_interval_ms = n;
        }
    }
}

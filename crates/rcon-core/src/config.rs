//! Delivery engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of sends per (server, command) pair.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Largest frame accepted from a server by default (1 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Configuration for the delivery engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum sends per command per server.
    pub max_attempts: u32,

    /// TCP connect (and DNS) deadline in milliseconds.
    pub connect_timeout_ms: u64,

    /// Per-attempt response deadline in milliseconds. `None` waits forever.
    pub response_timeout_ms: Option<u64>,

    /// Frames declaring a larger length are rejected as malformed.
    pub max_frame_size: usize,

    /// Deliver to the targets of one purchase line concurrently.
    pub parallel_targets: bool,

    /// Upper bound on concurrent targets when `parallel_targets` is set.
    pub max_parallel_targets: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            connect_timeout_ms: 5_000,
            response_timeout_ms: Some(10_000),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            parallel_targets: false,
            max_parallel_targets: 8,
        }
    }
}

impl EngineConfig {
    /// Connect deadline as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Response deadline as a [`Duration`].
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }

    /// Attempts per command, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Set the response deadline.
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    /// Enable concurrent fan-out across targets.
    pub fn with_parallel_targets(mut self, enabled: bool) -> Self {
        self.parallel_targets = enabled;
        self
    }
}

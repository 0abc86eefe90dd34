//! Scan configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Overall scan timeout (seconds). Reaching it cancels the shared
    /// scan context. 0 disables the timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Capacity of the merge queue shared by all provider workers.
    /// A full queue makes providers wait (back-pressure).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long a provider may keep running after cancellation before its
    /// worker abandons it (milliseconds).
    #[serde(default = "default_grace_period")]
    pub grace_period_ms: u64,
}

fn default_timeout() -> u64 {
    600 // 10 minutes
}

fn default_queue_capacity() -> usize {
    64
}

fn default_grace_period() -> u64 {
    2000 // 2 seconds
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            queue_capacity: default_queue_capacity(),
            grace_period_ms: default_grace_period(),
        }
    }
}

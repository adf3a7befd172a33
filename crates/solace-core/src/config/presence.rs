//! Presence reconciliation configuration.

use serde::{Deserialize, Serialize};

/// Presence engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Minutes after which an online presence record with no activity is
    /// considered stale.
    #[serde(default = "default_stale_after")]
    pub stale_after_minutes: i64,
    /// Buffer size of the presence change feed consumed by the
    /// propagation trigger.
    #[serde(default = "default_change_buffer")]
    pub change_buffer_size: usize,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            stale_after_minutes: default_stale_after(),
            change_buffer_size: default_change_buffer(),
        }
    }
}

fn default_stale_after() -> i64 {
    30
}

fn default_change_buffer() -> usize {
    256
}

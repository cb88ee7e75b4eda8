//! Command throttling limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Throttling configuration for the command router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottlingConfig {
    /// Commands of any kind released per interval.
    #[serde(default = "default_commands_per_second")]
    pub commands_per_second: usize,
    /// New-order commands released per interval.
    #[serde(default = "default_new_orders_per_second")]
    pub new_orders_per_second: usize,
    /// Throttle window in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ThrottlingConfig {
    fn default() -> Self {
        Self {
            commands_per_second: default_commands_per_second(),
            new_orders_per_second: default_new_orders_per_second(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl ThrottlingConfig {
    /// Throttle window.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

const fn default_commands_per_second() -> usize {
    1000
}

const fn default_new_orders_per_second() -> usize {
    100
}

const fn default_interval_ms() -> u64 {
    1000
}

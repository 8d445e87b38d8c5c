//! Auto-save configuration.

use std::time::Duration;

/// Default period between auto-saves.
pub const DEFAULT_AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest auto-save period accepted by [`SaveConfig::validated`].
pub const MIN_AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(1);

/// Controls periodic saving. Forced saves ignore `auto_save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveConfig {
    /// Whether unforced saves (the periodic ones) go through.
    pub auto_save: bool,
    /// Period of the auto-save interval.
    pub auto_save_interval: Duration,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            auto_save: false,
            auto_save_interval: DEFAULT_AUTO_SAVE_INTERVAL,
        }
    }
}

impl SaveConfig {
    /// Auto-save on, every `interval`.
    pub fn auto(interval: Duration) -> Self {
        Self {
            auto_save: true,
            auto_save_interval: interval,
        }
    }

    /// Clamps the interval to [`MIN_AUTO_SAVE_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if self.auto_save_interval < MIN_AUTO_SAVE_INTERVAL {
            tracing::warn!(
                requested_ms = self.auto_save_interval.as_millis() as u64,
                "auto-save interval too short, clamping"
            );
            self.auto_save_interval = MIN_AUTO_SAVE_INTERVAL;
        }
        self
    }
}

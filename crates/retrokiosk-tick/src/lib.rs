//! Countdown and interval timers for retrokiosk.
//!
//! Two timers live here:
//!
//! - [`CountdownTimer`] — the soft play-time limit. Ticks once per second,
//!   enters a warning mode near the end, and fires [`TimerEvent::Expired`]
//!   exactly once when it reaches zero. A `None` limit turns every
//!   operation into a no-op.
//! - [`IntervalTimer`] — a plain fixed-period repeater used for health
//!   pings and auto-save.
//!
//! # Integration
//!
//! Neither timer spawns a task. Each owns a single deadline and is polled
//! from the session controller's `tokio::select!` loop, so there is never
//! more than one live countdown of a kind:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* handle commands */ }
//!         event = timer.wait_for_tick() => { /* render or expire */ }
//!         _ = autosave.tick() => { /* save */ }
//!     }
//! }
//! ```
//!
//! A stopped timer's wait future pends forever, which `select!` simply
//! never picks.

use std::fmt;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Countdown granularity.
const TICK: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`CountdownTimer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Play-time limit in seconds. `None` = no limit enforced.
    pub limit_secs: Option<u32>,
    /// At or below this many remaining seconds the display is in
    /// warning mode. Purely visual.
    pub warning_threshold_secs: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            limit_secs: None,
            warning_threshold_secs: Self::DEFAULT_WARNING_THRESHOLD_SECS,
        }
    }
}

impl TimerConfig {
    /// Default warning threshold.
    pub const DEFAULT_WARNING_THRESHOLD_SECS: u32 = 30;

    /// Config with the given limit and the default warning threshold.
    pub fn with_limit(limit_secs: u32) -> Self {
        Self {
            limit_secs: Some(limit_secs),
            ..Default::default()
        }
    }

    /// Config that never counts down.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Normalizes out-of-range values.
    ///
    /// A limit of zero is not a positive duration and is treated as
    /// "no limit".
    pub fn validated(mut self) -> Self {
        if self.limit_secs == Some(0) {
            warn!("timer limit of 0 seconds is not positive, disabling limit");
            self.limit_secs = None;
        }
        self
    }

    /// Whether this config disables the countdown entirely.
    pub fn is_unlimited(&self) -> bool {
        self.limit_secs.is_none()
    }
}

// ---------------------------------------------------------------------------
// Events and snapshots
// ---------------------------------------------------------------------------

/// Result of one [`CountdownTimer::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second elapsed and time remains.
    Tick {
        remaining_secs: u32,
        warning: bool,
    },
    /// The countdown reached zero. Fires once per arming.
    Expired,
}

/// Snapshot of a countdown's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    /// `None` when no limit is enforced.
    pub remaining_secs: Option<u32>,
    pub running: bool,
}

/// What a countdown indicator should currently show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerDisplay {
    pub remaining_secs: u32,
    pub warning: bool,
}

impl TimerDisplay {
    /// The `m:ss` clock text.
    pub fn clock(&self) -> String {
        format_clock(self.remaining_secs)
    }
}

impl fmt::Display for TimerDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time Remaining: {}", self.clock())
    }
}

/// Formats seconds as `minutes:seconds`, seconds zero-padded to two digits.
pub fn format_clock(total_secs: u32) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

// ---------------------------------------------------------------------------
// CountdownTimer
// ---------------------------------------------------------------------------

/// One-second countdown toward a soft time limit.
pub struct CountdownTimer {
    config: TimerConfig,
    remaining: Option<u32>,
    /// Deadline of the next tick. `Some` exactly while running.
    next_tick: Option<Instant>,
    /// Set when `Expired` has fired; only [`reset`](Self::reset) clears it.
    expired: bool,
}

impl CountdownTimer {
    /// Creates a stopped countdown from config.
    pub fn new(config: TimerConfig) -> Self {
        let config = config.validated();
        Self {
            remaining: config.limit_secs,
            config,
            next_tick: None,
            expired: false,
        }
    }

    /// Arms the countdown.
    ///
    /// Returns `false` without doing anything when no limit is configured,
    /// when already running, or after expiry (use [`reset`](Self::reset)).
    pub fn start(&mut self) -> bool {
        if self.remaining.is_none() {
            trace!("countdown start ignored: no limit configured");
            return false;
        }
        if self.is_running() {
            trace!("countdown start ignored: already running");
            return false;
        }
        if self.expired {
            debug!("countdown start ignored: already expired");
            return false;
        }
        self.next_tick = Some(Instant::now() + TICK);
        debug!(remaining = ?self.remaining, "countdown started");
        true
    }

    /// Cancels any running countdown, restores the full duration and
    /// rearms it. No-op (returns `false`) without a limit.
    pub fn reset(&mut self) -> bool {
        if self.config.is_unlimited() {
            return false;
        }
        self.next_tick = None;
        self.remaining = self.config.limit_secs;
        self.expired = false;
        self.start()
    }

    /// Cancels the countdown. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            debug!(remaining = ?self.remaining, "countdown stopped");
        }
    }

    /// Waits for the next one-second tick.
    ///
    /// Pends forever while stopped, so it is safe to poll unconditionally
    /// inside `select!`.
    pub async fn wait_for_tick(&mut self) -> TimerEvent {
        let Some(deadline) = self.next_tick else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(deadline).await;

        let remaining = self.remaining.unwrap_or(0).saturating_sub(1);
        self.remaining = Some(remaining);

        if remaining == 0 {
            self.next_tick = None;
            self.expired = true;
            debug!("countdown expired");
            return TimerEvent::Expired;
        }

        // Keep the one-second cadence from the original deadline.
        self.next_tick = Some(deadline + TICK);
        let warning = self.is_warning();
        trace!(remaining, warning, "countdown tick");
        TimerEvent::Tick {
            remaining_secs: remaining,
            warning,
        }
    }

    /// Whether a countdown is currently armed.
    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Whether the countdown has expired since the last reset.
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Whether the display should be in warning mode.
    pub fn is_warning(&self) -> bool {
        self.remaining
            .is_some_and(|r| r <= self.config.warning_threshold_secs)
    }

    /// Remaining seconds, or `None` when unlimited.
    pub fn remaining_secs(&self) -> Option<u32> {
        self.remaining
    }

    /// Snapshot of the countdown.
    pub fn state(&self) -> TimerState {
        TimerState {
            remaining_secs: self.remaining,
            running: self.is_running(),
        }
    }

    /// What the indicator should show. `None` means hide it.
    pub fn display(&self) -> Option<TimerDisplay> {
        self.remaining.map(|remaining_secs| TimerDisplay {
            remaining_secs,
            warning: self.is_warning(),
        })
    }

    /// The config this timer was built from.
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// IntervalTimer
// ---------------------------------------------------------------------------

/// Fixed-period repeater with idempotent start/stop.
pub struct IntervalTimer {
    period: Duration,
    next: Option<Instant>,
    fired: u64,
}

impl IntervalTimer {
    /// Shortest accepted period.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// Creates a stopped interval. Periods below [`Self::MIN_PERIOD`]
    /// are raised to it.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Self::MIN_PERIOD),
            next: None,
            fired: 0,
        }
    }

    /// Arms the interval; the first tick fires one period from now.
    /// No-op (returns `false`) if already running.
    pub fn start(&mut self) -> bool {
        if self.next.is_some() {
            return false;
        }
        self.next = Some(Instant::now() + self.period);
        true
    }

    /// Disarms the interval. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.next = None;
    }

    /// Whether the interval is armed.
    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks fired since creation.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Waits for the next tick and returns the running tick count.
    /// Pends forever while stopped.
    pub async fn tick(&mut self) -> u64 {
        let Some(deadline) = self.next else {
            std::future::pending::<()>().await;
            unreachable!()
        };
        time::sleep_until(deadline).await;

        // Schedule from now so a stalled loop does not burst.
        self.next = Some(Instant::now() + self.period);
        self.fired += 1;
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock_pads_seconds() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(5), "0:05");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(600), "10:00");
    }

    #[test]
    fn test_timer_display_text() {
        let display = TimerDisplay {
            remaining_secs: 125,
            warning: false,
        };
        assert_eq!(display.to_string(), "Time Remaining: 2:05");
    }

    #[test]
    fn test_validated_zero_limit_becomes_unlimited() {
        let cfg = TimerConfig::with_limit(0).validated();
        assert!(cfg.is_unlimited());
    }

    #[test]
    fn test_unlimited_timer_has_no_display() {
        let timer = CountdownTimer::new(TimerConfig::unlimited());
        assert_eq!(timer.display(), None);
        assert_eq!(timer.remaining_secs(), None);
    }

    #[test]
    fn test_interval_min_period_enforced() {
        let interval = IntervalTimer::new(Duration::ZERO);
        assert_eq!(interval.period(), IntervalTimer::MIN_PERIOD);
    }
}

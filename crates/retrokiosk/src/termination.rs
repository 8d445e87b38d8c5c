//! Termination state machine and the save prompt.

use std::fmt;

use retrokiosk_tick::{CountdownTimer, TimerConfig, TimerEvent};

use crate::health::ConnectionLoss;

// ---------------------------------------------------------------------------
// TerminationState
// ---------------------------------------------------------------------------

/// Where the session is on its way out.
///
/// ```text
/// Active ──▶ PromptPending ──▶ Saving ─────▶ Ended
///   │  ▲          │      └───▶ Discarding ─▶ Ended
///   │  └──resume──┘
///   └───────────────────────────────────────▶ Ended
/// ```
///
/// Any state but `Ended` may jump straight to `Ended` (connection loss,
/// restart). `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationState {
    Active,
    PromptPending,
    Saving,
    Discarding,
    Ended,
}

impl TerminationState {
    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        use TerminationState::*;
        match (self, target) {
            (Ended, _) => false,
            (_, Ended) => true,
            (Active, PromptPending) => true,
            (PromptPending, Active | Saving | Discarding) => true,
            _ => false,
        }
    }

    /// Whether the session still accepts gameplay commands.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::PromptPending)
    }
}

impl fmt::Display for TerminationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::PromptPending => write!(f, "PromptPending"),
            Self::Saving => write!(f, "Saving"),
            Self::Discarding => write!(f, "Discarding"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

// ---------------------------------------------------------------------------
// EndReason
// ---------------------------------------------------------------------------

/// Why a session ended. `Display` gives the text sent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Prompt answered (either way), prompt timed out, or the host said end.
    UserEnded,
    /// Time ran out with no prompt and no hosting frame to ask.
    TimeExpired,
    ConnectionLost,
    ConnectionError,
    /// The host asked for a reload.
    Restart,
    /// Every handle was dropped or `shutdown` was called.
    Closed,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserEnded => "User ended session",
            Self::TimeExpired => "Time expired",
            Self::ConnectionLost => ConnectionLoss::Closed.reason(),
            Self::ConnectionError => ConnectionLoss::Error.reason(),
            Self::Restart => "Session restarted",
            Self::Closed => "Session closed",
        }
    }
}

impl From<ConnectionLoss> for EndReason {
    fn from(loss: ConnectionLoss) -> Self {
        match loss {
            ConnectionLoss::Closed => Self::ConnectionLost,
            ConnectionLoss::Error => Self::ConnectionError,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// What asked for the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTrigger {
    TimerExpired,
    HostEnd,
    BackNavigation,
    EscapeKey,
    Unload,
}

impl PromptTrigger {
    /// Out of time means there is nothing to resume into; only the host's
    /// `continue` can extend the session.
    pub fn allows_resume(self) -> bool {
        !matches!(self, Self::TimerExpired)
    }
}

/// The user's answer to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    /// Forced save, then end.
    Save,
    /// End without saving.
    Discard,
    /// Close the prompt and keep playing.
    Resume,
}

/// What a prompt renderer needs to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptView {
    pub trigger: PromptTrigger,
    /// Seconds left before the session ends without saving.
    pub countdown: u32,
    /// Whether a resume button makes sense.
    pub can_resume: bool,
}

/// The visible prompt and its countdown.
pub(crate) struct Prompt {
    trigger: Option<PromptTrigger>,
    countdown: CountdownTimer,
}

impl Prompt {
    pub(crate) fn new(countdown_secs: u32) -> Self {
        Self {
            trigger: None,
            countdown: CountdownTimer::new(TimerConfig {
                limit_secs: Some(countdown_secs),
                warning_threshold_secs: 0,
            }),
        }
    }

    /// Shows the prompt and arms a fresh countdown.
    pub(crate) fn show(&mut self, trigger: PromptTrigger) -> PromptView {
        self.trigger = Some(trigger);
        self.countdown.reset();
        self.current(trigger)
    }

    /// Changes what the visible prompt is for without touching its
    /// countdown. `None` if hidden.
    pub(crate) fn retrigger(&mut self, trigger: PromptTrigger) -> Option<PromptView> {
        let current = self.trigger.as_mut()?;
        *current = trigger;
        self.view()
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.trigger.is_some()
    }

    pub(crate) fn hide(&mut self) {
        self.trigger = None;
        self.countdown.stop();
    }

    pub(crate) fn view(&self) -> Option<PromptView> {
        self.trigger.map(|trigger| self.current(trigger))
    }

    fn current(&self, trigger: PromptTrigger) -> PromptView {
        PromptView {
            trigger,
            countdown: self.countdown.remaining_secs().unwrap_or(0),
            can_resume: trigger.allows_resume(),
        }
    }

    /// Next countdown tick; pends forever while hidden.
    pub(crate) async fn wait_for_tick(&mut self) -> TimerEvent {
        self.countdown.wait_for_tick().await
    }
}

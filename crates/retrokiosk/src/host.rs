//! Seams to the page around the session: the hosting context and the UI.
//!
//! Both traits are synchronous and owned by the controller task, so they
//! are stored as trait objects.

use retrokiosk_protocol::SessionMessage;
use retrokiosk_tick::TimerDisplay;

use crate::termination::PromptView;

/// How the session reaches whatever is hosting it.
///
/// Which method is used to leave depends on
/// [`HostContext`](crate::HostContext): `Embedded` posts a
/// [`SessionMessage::SessionEnd`], `ManagedShell` calls
/// [`return_to_host`](Self::return_to_host), `Standalone` calls
/// [`navigate`](Self::navigate).
pub trait HostBridge: Send + 'static {
    /// Posts a message to the hosting frame.
    fn post_message(&mut self, message: SessionMessage);

    /// Hands control back to the native shell.
    fn return_to_host(&mut self, reason: &str);

    /// Same-window navigation.
    fn navigate(&mut self, path: &str);

    /// Reloads the session from scratch.
    fn reload(&mut self);
}

/// Receives render calls. Every method defaults to doing nothing.
pub trait SessionView: Send + 'static {
    /// `None` hides the indicator (no time limit).
    fn render_timer(&mut self, display: Option<TimerDisplay>) {
        let _ = display;
    }

    /// Shows the prompt or updates its countdown.
    fn render_prompt(&mut self, prompt: &PromptView) {
        let _ = prompt;
    }

    fn hide_prompt(&mut self) {}
}

/// A view that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl SessionView for NullView {}

/// A host that only logs. Useful headless and as the builder's default.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHost;

impl HostBridge for LogHost {
    fn post_message(&mut self, message: SessionMessage) {
        tracing::info!(?message, "post to host");
    }

    fn return_to_host(&mut self, reason: &str) {
        tracing::info!(reason, "return to host");
    }

    fn navigate(&mut self, path: &str) {
        tracing::info!(path, "navigate");
    }

    fn reload(&mut self) {
        tracing::info!("reload");
    }
}

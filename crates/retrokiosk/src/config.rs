//! Session configuration: where the session runs and how it behaves.

use std::time::Duration;

use retrokiosk_save::SaveConfig;
use retrokiosk_session::TokenWaitConfig;
use retrokiosk_tick::TimerConfig;
use url::Url;

use crate::health::HealthConfig;

/// Where users are sent when a standalone session ends.
pub const DEFAULT_EXIT_PATH: &str = "/selectGame";

// ---------------------------------------------------------------------------
// HostContext
// ---------------------------------------------------------------------------

/// How the session is hosted, which decides how the user leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostContext {
    /// Inside a hosting frame: leave by posting `session_end`.
    Embedded,
    /// Inside a native shell application: leave through its return call.
    ManagedShell,
    /// Top-level page: leave by navigating to the exit path.
    #[default]
    Standalone,
}

impl HostContext {
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded)
    }
}

impl std::fmt::Display for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded => write!(f, "Embedded"),
            Self::ManagedShell => write!(f, "ManagedShell"),
            Self::Standalone => write!(f, "Standalone"),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerOrigins
// ---------------------------------------------------------------------------

/// What the page knows about its surroundings, used to find the
/// health-check server.
///
/// The server host is, in order: the hosting frame's host when readable,
/// the referring document's host, or the page's own hostname on
/// [`DEFAULT_PORT`](Self::DEFAULT_PORT).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOrigins {
    /// `host[:port]` of the hosting frame, if it could be read.
    pub parent_host: Option<String>,
    /// Full URL of the referring document.
    pub referrer: Option<String>,
    /// Hostname the page itself was served from.
    pub page_hostname: String,
    /// Whether the page was served over `https`.
    pub secure: bool,
}

impl Default for ServerOrigins {
    fn default() -> Self {
        Self {
            parent_host: None,
            referrer: None,
            page_hostname: "localhost".to_string(),
            secure: false,
        }
    }
}

impl ServerOrigins {
    /// Port assumed when neither the parent nor the referrer is known.
    pub const DEFAULT_PORT: u16 = 8080;

    /// The `host[:port]` the socket connects to.
    pub fn server_host(&self) -> String {
        if let Some(host) = self.parent_host.as_deref().filter(|h| !h.is_empty()) {
            return host.to_owned();
        }
        let referrer_host = self
            .referrer
            .as_deref()
            .and_then(|r| Url::parse(r).ok())
            .and_then(|url| {
                let host = url.host_str()?.to_owned();
                Some(match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host,
                })
            });
        referrer_host.unwrap_or_else(|| format!("{}:{}", self.page_hostname, Self::DEFAULT_PORT))
    }

    /// `ws(s)://<server host>/ws?token=<token>`.
    ///
    /// # Errors
    /// Returns a parse error if the derived host is not a valid authority.
    pub fn socket_url(&self, token: &str) -> Result<Url, url::ParseError> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let mut url = Url::parse(&format!("{scheme}://{}/ws", self.server_host()))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }
}

// ---------------------------------------------------------------------------
// PromptConfig
// ---------------------------------------------------------------------------

/// The end-of-session confirmation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    /// When `false`, end requests terminate immediately and navigation
    /// interceptions are ignored.
    pub enabled: bool,
    /// Seconds before an unanswered prompt ends the session without saving.
    pub countdown_secs: u32,
    /// How long the save-and-end choice waits for the write before
    /// ending anyway.
    pub final_save_timeout: Duration,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            countdown_secs: 10,
            final_save_timeout: Duration::from_secs(5),
        }
    }
}

impl PromptConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Raises a zero countdown to one second.
    pub fn validated(mut self) -> Self {
        if self.countdown_secs == 0 {
            tracing::warn!("prompt countdown of 0s, using 1s");
            self.countdown_secs = 1;
        }
        if self.final_save_timeout.is_zero() {
            self.final_save_timeout = Self::default().final_save_timeout;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Everything the controller is configured with.
///
/// Feature flags arrive here already parsed; reading them from a query
/// string or environment is the embedder's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub timer: TimerConfig,
    pub health: HealthConfig,
    pub save: SaveConfig,
    pub prompt: PromptConfig,
    pub token_wait: TokenWaitConfig,
    pub host_context: HostContext,
    /// Same-window navigation target for standalone sessions.
    pub exit_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            health: HealthConfig::default(),
            save: SaveConfig::default(),
            prompt: PromptConfig::default(),
            token_wait: TokenWaitConfig::default(),
            host_context: HostContext::default(),
            exit_path: DEFAULT_EXIT_PATH.to_string(),
        }
    }
}

impl SessionConfig {
    /// Applies every sub-config's clamp step.
    pub fn validated(self) -> Self {
        Self {
            timer: self.timer.validated(),
            health: self.health.validated(),
            save: self.save.validated(),
            prompt: self.prompt.validated(),
            exit_path: if self.exit_path.is_empty() {
                DEFAULT_EXIT_PATH.to_string()
            } else {
                self.exit_path
            },
            ..self
        }
    }
}

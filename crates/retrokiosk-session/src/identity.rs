//! Session identity: game id resolution and late-arriving auth tokens.
//!
//! The game id is fixed the moment a [`SessionIdentity`] is built. The
//! token is different: it may come from the launch URL, or later from the
//! hosting frame, so it lives in a shared [`TokenSlot`] that can be
//! filled once from anywhere.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::SessionError;

// ---------------------------------------------------------------------------
// GameId
// ---------------------------------------------------------------------------

/// The key save state is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameId(String);

impl GameId {
    /// Resolves the id with priority: explicit identifier, then the first
    /// UUID segment of `path`, then the sanitized display name.
    ///
    /// # Errors
    /// Returns [`SessionError::MissingGameId`] when all three are empty.
    pub fn resolve(
        explicit: Option<&str>,
        path: &str,
        display_name: &str,
    ) -> Result<Self, SessionError> {
        if let Some(id) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(Self(id.to_owned()));
        }
        if let Some(uuid) = uuid_in_path(path) {
            return Ok(Self(uuid.hyphenated().to_string()));
        }
        let sanitized = sanitize_display_name(display_name);
        if sanitized.is_empty() {
            return Err(SessionError::MissingGameId);
        }
        Ok(Self(sanitized))
    }

    /// The id as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First path segment in canonical hyphenated UUID form.
fn uuid_in_path(path: &str) -> Option<Uuid> {
    path.split(['/', '?', '#'])
        .filter(|seg| seg.len() == 36)
        .find_map(|seg| Uuid::try_parse(seg).ok())
}

/// Lowercases and keeps `[a-z0-9]`, collapsing every other run into a
/// single `-`. Leading and trailing separators are dropped.
pub fn sanitize_display_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// TokenSlot
// ---------------------------------------------------------------------------

/// Polling policy for the startup wait on a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWaitConfig {
    /// How often the slot is checked.
    pub poll: Duration,
    /// Give up and continue without a token after this long.
    pub cap: Duration,
}

impl Default for TokenWaitConfig {
    fn default() -> Self {
        Self {
            poll: Duration::from_millis(100),
            cap: Duration::from_secs(5),
        }
    }
}

/// Shared, fill-once holder for the auth token.
///
/// Clones share the same slot. [`offer`](Self::offer) only succeeds while
/// the slot is empty; [`refresh`](Self::refresh) overwrites and is meant
/// for re-authenticating a dropped connection.
#[derive(Debug, Clone)]
pub struct TokenSlot {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl Default for TokenSlot {
    fn default() -> Self {
        Self::empty()
    }
}

impl TokenSlot {
    /// A slot with no token yet.
    pub fn empty() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// A slot pre-filled from the launch URL. Empty strings are ignored.
    pub fn with_token(token: impl Into<String>) -> Self {
        let slot = Self::empty();
        slot.offer(token);
        slot
    }

    /// Sets the token if none is set yet. Returns `true` if it was taken.
    pub fn offer(&self, token: impl Into<String>) -> bool {
        let token = token.into();
        if token.is_empty() {
            return false;
        }
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(token);
            true
        })
    }

    /// Replaces the token unconditionally. Empty strings are ignored.
    pub fn refresh(&self, token: impl Into<String>) -> bool {
        let token = token.into();
        if token.is_empty() {
            return false;
        }
        self.tx.send_replace(Some(token));
        true
    }

    /// The current token, if any.
    pub fn get(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Whether a token has been set.
    pub fn is_set(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Polls the slot at `config.poll` until a token shows up or
    /// `config.cap` elapses. Never blocks past the cap.
    pub async fn wait(&self, config: &TokenWaitConfig) -> Option<String> {
        let deadline = Instant::now() + config.cap;
        loop {
            if let Some(token) = self.get() {
                return Some(token);
            }
            if Instant::now() >= deadline {
                tracing::info!(
                    waited_ms = config.cap.as_millis() as u64,
                    "no auth token arrived, continuing without one"
                );
                return None;
            }
            time::sleep(config.poll).await;
        }
    }
}

// ---------------------------------------------------------------------------
// SessionIdentity
// ---------------------------------------------------------------------------

/// Who is playing which game.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    game_id: Option<GameId>,
    display_name: String,
    token: TokenSlot,
}

impl SessionIdentity {
    /// Builds an identity. `game_id` is `None` when it could not be
    /// resolved; save and load then degrade to no-ops.
    pub fn new(game_id: Option<GameId>, display_name: impl Into<String>, token: TokenSlot) -> Self {
        Self {
            game_id,
            display_name: display_name.into(),
            token,
        }
    }

    /// Resolves the game id with [`GameId::resolve`] and logs when that
    /// fails instead of erroring.
    pub fn resolve(
        explicit: Option<&str>,
        path: &str,
        display_name: &str,
        token: TokenSlot,
    ) -> Self {
        let game_id = match GameId::resolve(explicit, path, display_name) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "saving and loading disabled");
                None
            }
        };
        Self::new(game_id, display_name, token)
    }

    pub fn game_id(&self) -> Option<&GameId> {
        self.game_id.as_ref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The shared token slot.
    pub fn token_slot(&self) -> &TokenSlot {
        &self.token
    }

    /// Current token, if one has arrived.
    pub fn token(&self) -> Option<String> {
        self.token.get()
    }
}

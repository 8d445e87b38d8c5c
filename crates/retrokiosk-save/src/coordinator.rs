//! The save coordinator: decides whether a save or load happens and
//! moves the state between the emulator and the backend.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use retrokiosk_protocol::SaveBody;
use retrokiosk_session::{Emulator, EmulatorBinding, SessionIdentity, sanitize_display_name};

use crate::{LoadResponse, SaveBackend, SaveConfig, SaveError};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a save did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Unforced save while auto-save is off.
    AutoSaveDisabled,
    /// Another save is still running.
    InFlight,
    /// No auth token has arrived.
    NoToken,
    /// The game id could not be resolved.
    NoGameId,
    /// The game has not started yet.
    EmulatorUnbound,
    /// The emulator produced an empty buffer.
    EmptyState,
    /// The session has already ended.
    SessionEnded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AutoSaveDisabled => "auto-save disabled",
            Self::InFlight => "save already in flight",
            Self::NoToken => "no auth token",
            Self::NoGameId => "no game id",
            Self::EmulatorUnbound => "emulator not bound",
            Self::EmptyState => "nothing to save",
            Self::SessionEnded => "session ended",
        })
    }
}

/// What a call to [`SaveCoordinator::save`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The backend accepted `bytes` of raw state.
    Saved { bytes: usize },
    /// Nothing was sent.
    Skipped(SkipReason),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// Holds the single-flight flag and clears it on drop, including when the
/// save future is cancelled mid-request.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// SaveCoordinator
// ---------------------------------------------------------------------------

/// Moves emulator state to and from a [`SaveBackend`].
///
/// Clones share the backend, the emulator binding and the in-flight flag,
/// so a clone handed to a background auto-save task still excludes a
/// concurrent forced save.
pub struct SaveCoordinator<B, E> {
    backend: Arc<B>,
    emulator: EmulatorBinding<E>,
    identity: SessionIdentity,
    config: SaveConfig,
    in_flight: Arc<AtomicBool>,
}

impl<B, E> Clone for SaveCoordinator<B, E> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            emulator: self.emulator.clone(),
            identity: self.identity.clone(),
            config: self.config.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<B: SaveBackend, E: Emulator> SaveCoordinator<B, E> {
    pub fn new(
        backend: B,
        emulator: EmulatorBinding<E>,
        identity: SessionIdentity,
        config: SaveConfig,
    ) -> Self {
        Self {
            backend: Arc::new(backend),
            emulator,
            identity,
            config: config.validated(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn emulator(&self) -> &EmulatorBinding<E> {
        &self.emulator
    }

    /// Whether a save is currently running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Snapshots the emulator and writes it to the backend.
    ///
    /// Unforced saves only run with auto-save enabled. Every reason not
    /// to save comes back as [`SaveOutcome::Skipped`]; a save that was
    /// attempted and failed comes back as `Err`.
    ///
    /// # Errors
    /// Returns [`SaveError`] when the emulator or the backend fails.
    pub async fn save(&self, force: bool) -> Result<SaveOutcome, SaveError> {
        if !force && !self.config.auto_save {
            return Ok(self.skipped(SkipReason::AutoSaveDisabled));
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return Ok(self.skipped(SkipReason::InFlight));
        };
        let Some(game_id) = self.identity.game_id() else {
            return Ok(self.skipped(SkipReason::NoGameId));
        };
        let Some(token) = self.identity.token() else {
            return Ok(self.skipped(SkipReason::NoToken));
        };
        let Some(state) = self.emulator.snapshot().await? else {
            return Ok(self.skipped(SkipReason::EmulatorUnbound));
        };
        if state.is_empty() {
            return Ok(self.skipped(SkipReason::EmptyState));
        }

        let body = SaveBody::from_state(&state);
        if let Err(e) = self.backend.write(game_id, &token, &body).await {
            tracing::warn!(game_id = %game_id, error = %e, "save failed");
            return Err(e);
        }

        tracing::info!(game_id = %game_id, bytes = state.len(), forced = force, "state saved");
        Ok(SaveOutcome::Saved { bytes: state.len() })
    }

    /// Reads the saved state for this game.
    ///
    /// When the backend has nothing, the bundled fallback file is tried
    /// once. A missing or failing fallback yields `Ok(None)`.
    ///
    /// # Errors
    /// Any backend failure other than "not found".
    pub async fn load(&self) -> Result<Option<Vec<u8>>, SaveError> {
        let Some(game_id) = self.identity.game_id() else {
            tracing::debug!("no game id, nothing to load");
            return Ok(None);
        };
        let token = self.identity.token();

        match self.backend.read(game_id, token.as_deref()).await {
            Ok(LoadResponse::Found(state)) if !state.is_empty() => {
                tracing::info!(game_id = %game_id, bytes = state.len(), "saved state loaded");
                Ok(Some(state))
            }
            Ok(LoadResponse::Found(_)) => Ok(None),
            Ok(LoadResponse::NotFound) => Ok(self.load_fallback().await),
            Err(e) => {
                tracing::warn!(game_id = %game_id, error = %e, "load failed");
                Err(e)
            }
        }
    }

    async fn load_fallback(&self) -> Option<Vec<u8>> {
        let key = sanitize_display_name(self.identity.display_name());
        if key.is_empty() {
            return None;
        }
        match self.backend.fetch_fallback(&key).await {
            Ok(Some(state)) => {
                tracing::info!(key = %key, bytes = state.len(), "fallback state loaded");
                Some(state)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "fallback fetch failed");
                None
            }
        }
    }

    /// [`load`](Self::load), then hands the state to the emulator.
    /// Returns whether state was applied.
    ///
    /// # Errors
    /// Load failures and emulator failures.
    pub async fn restore(&self) -> Result<bool, SaveError> {
        match self.load().await? {
            Some(state) => Ok(self.emulator.restore(&state).await?),
            None => Ok(false),
        }
    }

    fn skipped(&self, reason: SkipReason) -> SaveOutcome {
        tracing::debug!(reason = %reason, "save skipped");
        SaveOutcome::Skipped(reason)
    }
}

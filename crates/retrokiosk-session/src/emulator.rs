//! Emulator adapter trait and the shared binding slot.
//!
//! retrokiosk does not emulate anything. The external engine is adapted
//! to [`Emulator`] and handed over when the game starts. Until then the
//! [`EmulatorBinding`] is empty and everything that needs the engine
//! (pause, snapshot, restore) reports that it did nothing.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::SessionError;

/// The operations the session controller needs from an emulation engine.
///
/// # Example
///
/// ```rust
/// use retrokiosk_session::{Emulator, SessionError};
///
/// /// Stand-in engine whose "state" is a frame counter.
/// struct Counter {
///     frames: u64,
///     paused: bool,
/// }
///
/// impl Emulator for Counter {
///     fn pause(&mut self) {
///         self.paused = true;
///     }
///
///     fn play(&mut self) {
///         self.paused = false;
///     }
///
///     fn save_state(&mut self) -> Result<Vec<u8>, SessionError> {
///         Ok(self.frames.to_le_bytes().to_vec())
///     }
///
///     fn load_state(&mut self, state: &[u8]) -> Result<(), SessionError> {
///         let bytes: [u8; 8] = state
///             .try_into()
///             .map_err(|_| SessionError::Emulator("bad state length".into()))?;
///         self.frames = u64::from_le_bytes(bytes);
///         Ok(())
///     }
/// }
/// ```
pub trait Emulator: Send + 'static {
    /// Suspends emulation.
    fn pause(&mut self);

    /// Resumes emulation.
    fn play(&mut self);

    /// Serializes the current machine state. An empty buffer means there
    /// is nothing worth saving.
    fn save_state(&mut self) -> Result<Vec<u8>, SessionError>;

    /// Replaces the machine state with a previously saved buffer.
    fn load_state(&mut self, state: &[u8]) -> Result<(), SessionError>;
}

/// Shared slot holding the emulator once the game has started.
///
/// Clones share the slot. Access is serialized through an async mutex so
/// a snapshot taken by a background save never interleaves with a pause.
pub struct EmulatorBinding<E> {
    slot: Arc<Mutex<Option<E>>>,
}

impl<E> Clone for EmulatorBinding<E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<E: Emulator> Default for EmulatorBinding<E> {
    fn default() -> Self {
        Self::unbound()
    }
}

impl<E: Emulator> EmulatorBinding<E> {
    /// An empty binding.
    pub fn unbound() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Stores the engine. Returns `true` if this replaced an earlier one.
    pub async fn bind(&self, emulator: E) -> bool {
        self.slot.lock().await.replace(emulator).is_some()
    }

    /// Whether an engine is bound.
    pub async fn is_bound(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Pauses the engine. Returns `false` if none is bound.
    pub async fn pause(&self) -> bool {
        match self.slot.lock().await.as_mut() {
            Some(emu) => {
                emu.pause();
                true
            }
            None => false,
        }
    }

    /// Resumes the engine. Returns `false` if none is bound.
    pub async fn play(&self) -> bool {
        match self.slot.lock().await.as_mut() {
            Some(emu) => {
                emu.play();
                true
            }
            None => false,
        }
    }

    /// Serializes the engine state. `Ok(None)` if none is bound.
    ///
    /// # Errors
    /// Propagates the engine's own failure.
    pub async fn snapshot(&self) -> Result<Option<Vec<u8>>, SessionError> {
        match self.slot.lock().await.as_mut() {
            Some(emu) => emu.save_state().map(Some),
            None => Ok(None),
        }
    }

    /// Loads `state` into the engine. `Ok(false)` if none is bound.
    ///
    /// # Errors
    /// Propagates the engine's own failure.
    pub async fn restore(&self, state: &[u8]) -> Result<bool, SessionError> {
        match self.slot.lock().await.as_mut() {
            Some(emu) => emu.load_state(state).map(|()| true),
            None => Ok(false),
        }
    }
}

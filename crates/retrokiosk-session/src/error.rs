//! Error types for the session layer.

/// Errors raised while resolving identity or talking to the emulator.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No explicit id, no UUID in the path, and nothing usable in the
    /// display name.
    #[error("could not resolve a game id")]
    MissingGameId,

    /// The emulator failed to produce or accept a state buffer.
    #[error("emulator error: {0}")]
    Emulator(String),
}

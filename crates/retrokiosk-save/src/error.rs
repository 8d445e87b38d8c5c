//! Error types for saving and loading.

use retrokiosk_session::SessionError;

/// Errors returned by a save or load that actually reached the backend.
///
/// Benign no-ops (auto-save off, nothing to save, no token) are not
/// errors; see [`SaveOutcome`](crate::SaveOutcome).
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The request never got a response.
    #[error("save backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("save backend returned {status} for {url}")]
    Status { status: u16, url: String },

    /// A backend URL could not be built.
    #[error("invalid save backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The emulator failed to produce or accept state.
    #[error(transparent)]
    Emulator(#[from] SessionError),
}

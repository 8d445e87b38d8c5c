//! Unified error type for retrokiosk.

use retrokiosk_protocol::ProtocolError;
use retrokiosk_save::SaveError;
use retrokiosk_session::SessionError;
use retrokiosk_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum KioskError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Save(#[from] SaveError),

    /// The controller task is gone; the handle can no longer reach it.
    #[error("session controller is no longer running")]
    SessionClosed,
}

//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON or a wrong shape.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// `stateData` was not a valid base64 payload.
    #[error("invalid state data: {0}")]
    InvalidStateData(#[source] base64::DecodeError),

    /// The message decoded but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

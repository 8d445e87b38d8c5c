//! Codec trait and the JSON implementation.
//!
//! Socket frames and host messages are JSON text, so the codec works in
//! `String`/`&str` rather than bytes.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to text and decodes them back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] on malformed or mismatched input.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use retrokiosk_protocol::{Codec, Envelope, JsonCodec, MessageKind};
///
/// let codec = JsonCodec;
/// let frame = codec.encode(&Envelope::health_check()).unwrap();
/// let decoded: Envelope = codec.decode(&frame).unwrap();
/// assert_eq!(decoded.kind(), MessageKind::HealthStatusCheck);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

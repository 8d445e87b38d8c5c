//! Wire formats for retrokiosk.
//!
//! This crate defines every shape that leaves or enters the session
//! controller:
//!
//! - **Socket envelopes** ([`Envelope`], [`MessageKind`]) — the JSON text
//!   frames exchanged with the backend over the health-check WebSocket.
//! - **Host-frame messages** ([`HostMessage`], [`SessionMessage`]) — what
//!   the hosting page sends in and what the session posts back out.
//! - **Save bodies** ([`SaveBody`]) — the REST payload carrying emulator
//!   state as a base64 data URL.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — text encoding of the above.
//!
//! The protocol layer knows nothing about sockets or timers; it only
//! converts between Rust types and text.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    Compression, Envelope, HostAction, HostMessage, MessageKind, SaveBody, SessionMessage,
    MSG_VERSION, STATE_DATA_URL_PREFIX, STATUS_OK, now_iso8601,
};

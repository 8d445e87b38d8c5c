//! Wire types: socket envelopes, host-frame messages, and save bodies.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::ProtocolError;

/// Envelope schema version sent in every frame.
pub const MSG_VERSION: &str = "1";

/// Status code carried by client-originated frames.
pub const STATUS_OK: u16 = 200;

/// Prefix of the `stateData` data URL.
pub const STATE_DATA_URL_PREFIX: &str = "data:application/octet-stream;base64,";

/// Current UTC time as an RFC 3339 / ISO-8601 string.
pub fn now_iso8601() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// The `type` field of an [`Envelope`].
///
/// Types this client does not know are kept verbatim in `Other` so they
/// can be logged and ignored instead of failing the decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Client → server liveness ping.
    HealthStatusCheck,
    /// Server → client answer to a ping.
    HealthStatusCheckResponse,
    /// Anything else.
    Other(String),
}

impl MessageKind {
    /// The wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            Self::HealthStatusCheck => "health_status_check",
            Self::HealthStatusCheckResponse => "health_status_check_response",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for MessageKind {
    fn from(s: &str) -> Self {
        match s {
            "health_status_check" => Self::HealthStatusCheck,
            "health_status_check_response" => Self::HealthStatusCheckResponse,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

fn default_msgver() -> String {
    MSG_VERSION.to_owned()
}

fn default_status() -> u16 {
    STATUS_OK
}

/// One JSON text frame on the health-check socket.
///
/// ```text
/// { "msgver": "1", "type": "health_status_check", "ts": "2025-01-01T00:00:00Z",
///   "status": 200, "payload": {} }
/// ```
///
/// Incoming frames only need a `type`; the other fields fall back to
/// defaults so a terse server reply still decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default = "default_msgver")]
    pub msgver: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub ts: String,

    #[serde(default = "default_status")]
    pub status: u16,

    /// Omitted from the JSON entirely when `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Envelope {
    /// Builds a client frame stamped with the current time.
    pub fn new(kind: MessageKind, payload: Option<Value>) -> Self {
        Self {
            msgver: MSG_VERSION.to_owned(),
            kind: kind.as_str().to_owned(),
            ts: now_iso8601(),
            status: STATUS_OK,
            payload,
        }
    }

    /// A `health_status_check` ping with an empty object payload.
    pub fn health_check() -> Self {
        Self::new(
            MessageKind::HealthStatusCheck,
            Some(Value::Object(serde_json::Map::new())),
        )
    }

    /// The parsed `type`.
    pub fn kind(&self) -> MessageKind {
        MessageKind::from(self.kind.as_str())
    }
}

// ---------------------------------------------------------------------------
// Host-frame messages
// ---------------------------------------------------------------------------

/// An instruction from the hosting frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostAction {
    /// End the session now.
    End,
    /// Extend the session (e.g. after payment): reset timer and resume.
    Continue,
    /// Reload the session from scratch.
    Restart,
}

/// A message received from the hosting frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// `{ "jwt": "<token>" }`
    Token(String),
    /// `{ "action": "end" | "continue" | "restart" }`
    Action(HostAction),
}

impl HostMessage {
    /// Interprets a posted object.
    ///
    /// A non-empty `jwt` wins over `action`. Anything unrecognized
    /// (unknown action, non-object, empty token) yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        if let Some(token) = obj.get("jwt").and_then(Value::as_str) {
            if !token.is_empty() {
                return Some(Self::Token(token.to_owned()));
            }
        }

        let action = obj.get("action")?;
        serde_json::from_value::<HostAction>(action.clone())
            .ok()
            .map(Self::Action)
    }

    /// Parses a posted message from JSON text.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the text is not JSON at all.
    pub fn parse(text: &str) -> Result<Option<Self>, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::Decode)?;
        Ok(Self::from_value(&value))
    }
}

/// A message posted from the session to the hosting frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionMessage {
    /// Time ran out; asks the host how to proceed.
    SessionOptions,
    /// The session is over.
    SessionEnd { reason: String },
}

// ---------------------------------------------------------------------------
// Save bodies
// ---------------------------------------------------------------------------

/// Compression applied to `stateData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
}

/// JSON body of `POST /api/v1/game-state/save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveBody {
    /// Base64 data URL of the raw emulator state.
    #[serde(rename = "stateData")]
    pub state_data: String,
    #[serde(default)]
    pub compression: Compression,
}

impl SaveBody {
    /// Encodes a raw state buffer as a data URL body.
    pub fn from_state(state: &[u8]) -> Self {
        Self {
            state_data: format!("{STATE_DATA_URL_PREFIX}{}", STANDARD.encode(state)),
            compression: Compression::None,
        }
    }

    /// Decodes `stateData` back into raw bytes.
    ///
    /// Accepts any `data:...;base64,` prefix as well as bare base64.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidStateData`] for malformed base64.
    pub fn decode_state(&self) -> Result<Vec<u8>, ProtocolError> {
        let encoded = match self.state_data.strip_prefix("data:") {
            Some(rest) => rest
                .split_once("base64,")
                .map(|(_, data)| data)
                .ok_or_else(|| {
                    ProtocolError::InvalidMessage("stateData data URL is not base64".into())
                })?,
            None => self.state_data.as_str(),
        };
        STANDARD
            .decode(encoded)
            .map_err(ProtocolError::InvalidStateData)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON shape tests. A mismatch here means the backend or the host
    //! page cannot parse what we send.

    use super::*;
    use serde_json::json;

    // =====================================================================
    // Envelope
    // =====================================================================

    #[test]
    fn test_health_check_json_format() {
        let json = serde_json::to_value(Envelope::health_check()).unwrap();

        assert_eq!(json["msgver"], "1");
        assert_eq!(json["type"], "health_status_check");
        assert_eq!(json["status"], 200);
        assert_eq!(json["payload"], json!({}));
        let ts = json["ts"].as_str().unwrap();
        assert!(OffsetDateTime::parse(ts, &Rfc3339).is_ok(), "ts must be ISO-8601: {ts}");
    }

    #[test]
    fn test_envelope_without_payload_omits_field() {
        let env = Envelope::new(MessageKind::HealthStatusCheck, None);
        let json = serde_json::to_value(&env).unwrap();
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_envelope_decodes_terse_server_reply() {
        let env: Envelope =
            serde_json::from_str(r#"{"type":"health_status_check_response"}"#).unwrap();
        assert_eq!(env.kind(), MessageKind::HealthStatusCheckResponse);
        assert_eq!(env.msgver, "1");
        assert_eq!(env.status, 200);
    }

    #[test]
    fn test_envelope_unknown_type_is_other() {
        let env: Envelope = serde_json::from_str(
            r#"{"msgver":"1","type":"leaderboard_update","ts":"x","status":200}"#,
        )
        .unwrap();
        assert_eq!(env.kind(), MessageKind::Other("leaderboard_update".into()));
    }

    #[test]
    fn test_envelope_missing_type_fails() {
        let result: Result<Envelope, _> = serde_json::from_str(r#"{"msgver":"1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_message_kind_display() {
        assert_eq!(
            MessageKind::HealthStatusCheckResponse.to_string(),
            "health_status_check_response"
        );
    }

    // =====================================================================
    // HostMessage
    // =====================================================================

    #[test]
    fn test_host_message_token() {
        let msg = HostMessage::from_value(&json!({ "jwt": "abc.def" }));
        assert_eq!(msg, Some(HostMessage::Token("abc.def".into())));
    }

    #[test]
    fn test_host_message_token_wins_over_action() {
        let msg = HostMessage::from_value(&json!({ "jwt": "t", "action": "end" }));
        assert_eq!(msg, Some(HostMessage::Token("t".into())));
    }

    #[test]
    fn test_host_message_empty_token_falls_through_to_action() {
        let msg = HostMessage::from_value(&json!({ "jwt": "", "action": "continue" }));
        assert_eq!(msg, Some(HostMessage::Action(HostAction::Continue)));
    }

    #[test]
    fn test_host_message_actions() {
        for (text, action) in [
            ("end", HostAction::End),
            ("continue", HostAction::Continue),
            ("restart", HostAction::Restart),
        ] {
            let msg = HostMessage::from_value(&json!({ "action": text }));
            assert_eq!(msg, Some(HostMessage::Action(action)));
        }
    }

    #[test]
    fn test_host_message_unknown_action_is_none() {
        assert_eq!(HostMessage::from_value(&json!({ "action": "dance" })), None);
        assert_eq!(HostMessage::from_value(&json!("end")), None);
        assert_eq!(HostMessage::from_value(&json!({})), None);
    }

    #[test]
    fn test_host_message_parse_rejects_non_json() {
        assert!(HostMessage::parse("{oops").is_err());
        assert_eq!(
            HostMessage::parse(r#"{"action":"end"}"#).unwrap(),
            Some(HostMessage::Action(HostAction::End))
        );
    }

    // =====================================================================
    // SessionMessage
    // =====================================================================

    #[test]
    fn test_session_options_json_format() {
        let json = serde_json::to_value(SessionMessage::SessionOptions).unwrap();
        assert_eq!(json, json!({ "type": "session_options" }));
    }

    #[test]
    fn test_session_end_json_format() {
        let json = serde_json::to_value(SessionMessage::SessionEnd {
            reason: "User ended session".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            json!({ "type": "session_end", "reason": "User ended session" })
        );
    }

    // =====================================================================
    // SaveBody
    // =====================================================================

    #[test]
    fn test_save_body_json_format() {
        let json = serde_json::to_value(SaveBody::from_state(&[1, 2, 3])).unwrap();
        assert_eq!(
            json,
            json!({
                "stateData": "data:application/octet-stream;base64,AQID",
                "compression": "none"
            })
        );
    }

    #[test]
    fn test_save_body_decode_state() {
        let body = SaveBody::from_state(b"savestate");
        assert_eq!(body.decode_state().unwrap(), b"savestate");
    }

    #[test]
    fn test_save_body_decode_bare_base64() {
        let body = SaveBody {
            state_data: "AQID".into(),
            compression: Compression::None,
        };
        assert_eq!(body.decode_state().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_save_body_decode_invalid_base64() {
        let body = SaveBody {
            state_data: format!("{STATE_DATA_URL_PREFIX}!!!"),
            compression: Compression::None,
        };
        assert!(matches!(
            body.decode_state(),
            Err(ProtocolError::InvalidStateData(_))
        ));
    }
}

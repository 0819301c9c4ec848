//! Command and envelope types.
//!
//! A [`Command`] travels from the dashboard to the observed node; an
//! [`Envelope`] is the unit that comes back, over either transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportResult;

/// Command and envelope names with a fixed meaning to the session layer.
pub mod reserved {
    /// Service handshake, sent once per successful connect or reconnect.
    pub const HELLO: &str = "hello";

    /// Keepalive command. Its responses are never waited on by the transport.
    pub const PING: &str = "ping";

    /// Node switch request (command) and its confirmation (envelope).
    pub const SETUP_PROXY: &str = "setup_proxy";

    /// Unsolicited node identity announcement.
    pub const EHLO: &str = "ehlo";

    /// Returns `true` for envelope types that update the active node instead
    /// of answering a waiting caller.
    pub fn is_control_envelope(kind: &str) -> bool {
        kind == EHLO || kind == SETUP_PROXY
    }
}

/// An outgoing request to the observed node.
///
/// `name` doubles as the correlation key: the response envelope carries the
/// same string in its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Command name, e.g. `"system"` or `"table/#Port<0.7.0>"`.
    pub name: String,

    /// Optional opaque payload.
    pub payload: Option<Value>,
}

impl Command {
    /// Creates a command without payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    /// Creates a command carrying `payload`.
    pub fn with_payload(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload: Some(payload),
        }
    }

    /// The handshake command.
    pub fn hello() -> Self {
        Self::new(reserved::HELLO)
    }

    /// The keepalive command.
    pub fn ping() -> Self {
        Self::new(reserved::PING)
    }

    /// A node switch request for `node`.
    pub fn setup_proxy(node: &str) -> Self {
        Self::with_payload(reserved::SETUP_PROXY, Value::String(node.to_string()))
    }

    /// Borrowed wire representation.
    pub fn to_wire(&self) -> WireCommand<'_> {
        WireCommand {
            command: &self.name,
            data: self.payload.as_ref(),
        }
    }

    /// Serializes the command into a text frame.
    pub fn encode(&self) -> TransportResult<String> {
        Ok(serde_json::to_string(&self.to_wire())?)
    }
}

/// Wire form of a [`Command`]: `{"command": ..., "data": ...}`.
#[derive(Debug, Serialize)]
pub struct WireCommand<'a> {
    /// Command name.
    pub command: &'a str,

    /// Payload, serialized as `null` when absent.
    pub data: Option<&'a Value>,
}

/// The response unit delivered over either transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Name of the originating command, or a reserved control type.
    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque response payload.
    #[serde(default)]
    pub data: Value,

    /// Seconds since the Unix epoch. Filled in at receipt time when the
    /// sender did not provide one.
    #[serde(default = "now_timestamp")]
    pub timestamp: i64,
}

impl Envelope {
    /// Creates an envelope stamped with the current time.
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: now_timestamp(),
        }
    }

    /// Parses a text frame received from the stream channel.
    pub fn decode(text: &str) -> TransportResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns `true` for `ehlo` and `setup_proxy` envelopes.
    pub fn is_control(&self) -> bool {
        reserved::is_control_envelope(&self.kind)
    }

    /// Extracts the node name carried by a control envelope.
    ///
    /// `ehlo` announces the service's own node under `name` (older services
    /// use `node`); `setup_proxy` confirms the switch under `node`. A bare
    /// string payload is accepted for both.
    pub fn announced_node(&self) -> Option<&str> {
        if let Value::String(node) = &self.data {
            return Some(node);
        }

        let keys: &[&str] = match self.kind.as_str() {
            reserved::EHLO => &["name", "node"],
            reserved::SETUP_PROXY => &["node"],
            _ => return None,
        };

        keys.iter()
            .find_map(|key| self.data.get(key).and_then(Value::as_str))
    }
}

fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_wire_format() {
        let frame = Command::new("system").encode().unwrap();
        assert_eq!(frame, r#"{"command":"system","data":null}"#);

        let frame = Command::setup_proxy("worker@host").encode().unwrap();
        assert_eq!(frame, r#"{"command":"setup_proxy","data":"worker@host"}"#);
    }

    #[test]
    fn test_envelope_decode_fills_timestamp() {
        let before = chrono::Utc::now().timestamp();
        let envelope = Envelope::decode(r#"{"type":"memory","data":{"total":1024}}"#).unwrap();

        assert_eq!(envelope.kind, "memory");
        assert_eq!(envelope.data["total"], 1024);
        assert!(envelope.timestamp >= before);
    }

    #[test]
    fn test_envelope_decode_keeps_sender_timestamp() {
        let envelope = Envelope::decode(r#"{"type":"memory","data":1,"timestamp":42}"#).unwrap();
        assert_eq!(envelope.timestamp, 42);
    }

    #[test]
    fn test_envelope_without_data_is_null() {
        let envelope = Envelope::decode(r#"{"type":"hello"}"#).unwrap();
        assert!(envelope.data.is_null());
    }

    #[test]
    fn test_envelope_decode_rejects_garbage() {
        assert!(Envelope::decode("not json").is_err());
        assert!(Envelope::decode(r#"{"data":1}"#).is_err());
    }

    #[test]
    fn test_announced_node() {
        let ehlo = Envelope::new("ehlo", json!({"name": "app@host", "version": "0.1.8"}));
        assert_eq!(ehlo.announced_node(), Some("app@host"));

        let legacy = Envelope::new("ehlo", json!({"node": "app@host"}));
        assert_eq!(legacy.announced_node(), Some("app@host"));

        let proxy = Envelope::new("setup_proxy", json!({"node": "nodeB"}));
        assert_eq!(proxy.announced_node(), Some("nodeB"));

        let bare = Envelope::new("setup_proxy", json!("local"));
        assert_eq!(bare.announced_node(), Some("local"));

        let other = Envelope::new("process", json!({"node": "x"}));
        assert_eq!(other.announced_node(), None);
        assert!(!other.is_control());
    }
}

//! Core transport types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Enumerates the transports a session can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// Persistent WebSocket channel, push-capable.
    Stream,
    /// One HTTP exchange per command, not push-capable.
    Polling,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => write!(f, "stream"),
            Self::Polling => write!(f, "polling"),
        }
    }
}

/// Lifecycle state of a transport.
///
/// The stream transport walks
/// `Connecting -> Open -> (Closing | Broken) -> [Reconnecting -> Open]*`
/// and ends in `Closed`. The polling transport reports `Open` while its last
/// exchange succeeded and `Broken` after a failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    /// The first connection attempt is in flight.
    Connecting,
    /// Ready to send commands and receive envelopes.
    Open,
    /// Connectivity loss was detected; reconnection is about to start.
    Broken,
    /// Reconnection attempts are in progress.
    Reconnecting,
    /// An explicit close is in progress.
    Closing,
    /// Closed explicitly, or the first connection never succeeded.
    Closed,
}

impl TransportState {
    /// Returns `true` when requests are accepted.
    pub const fn accepts_requests(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Broken => write!(f, "broken"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Describes the capabilities of a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportCapabilities {
    /// Whether the node can deliver envelopes nobody asked for (`ehlo`).
    pub supports_push: bool,

    /// Whether responses arrive out of band and need correlation.
    pub supports_bidirectional: bool,

    /// Whether several requests can be in flight over one connection.
    pub supports_multiplexing: bool,

    /// The maximum inbound message size in bytes, if limited.
    pub max_message_size: Option<usize>,
}

impl TransportCapabilities {
    /// Capabilities of the persistent stream channel.
    pub const fn stream(max_message_size: Option<usize>) -> Self {
        Self {
            supports_push: true,
            supports_bidirectional: true,
            supports_multiplexing: true,
            max_message_size,
        }
    }

    /// Capabilities of one-shot request/response exchanges.
    pub const fn polling(max_message_size: Option<usize>) -> Self {
        Self {
            supports_push: false,
            supports_bidirectional: false,
            supports_multiplexing: true,
            max_message_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_type_display() {
        assert_eq!(TransportType::Stream.to_string(), "stream");
        assert_eq!(TransportType::Polling.to_string(), "polling");
    }

    #[test]
    fn test_transport_state_display() {
        assert_eq!(TransportState::Open.to_string(), "open");
        assert_eq!(TransportState::Reconnecting.to_string(), "reconnecting");
    }

    #[test]
    fn test_only_open_accepts_requests() {
        assert!(TransportState::Open.accepts_requests());
        for state in [
            TransportState::Connecting,
            TransportState::Broken,
            TransportState::Reconnecting,
            TransportState::Closing,
            TransportState::Closed,
        ] {
            assert!(!state.accepts_requests(), "{state} must fail fast");
        }
    }

    #[test]
    fn test_capabilities() {
        assert!(TransportCapabilities::stream(None).supports_push);
        assert!(!TransportCapabilities::polling(None).supports_push);
    }
}

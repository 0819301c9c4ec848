//! Session error types

use thiserror::Error;

use wobserver_transport_traits::TransportError;

/// Result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by [`Session`](crate::Session) operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SessionError {
    /// The active transport failed the operation
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response envelope did not have the shape a typed helper expects
    #[error("Failed to decode '{command}' response: {source}")]
    Decode {
        /// The command whose response was malformed
        command: String,
        /// The underlying decoding error
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    /// Returns `true` when the failure is due to the service being unreachable.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connectivity(),
            Self::Decode { .. } => false,
        }
    }

    /// The underlying transport error, if any
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Decode { .. } => None,
        }
    }
}

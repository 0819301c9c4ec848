//! Connectivity events.

use tokio::sync::broadcast;

use crate::node::NodeAddress;
use crate::types::TransportType;

/// Connectivity transitions observed by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A transport was established (stream success or polling fallback).
    Connected {
        /// The transport now serving requests.
        transport: TransportType,
    },

    /// Connectivity was lost.
    Disconnected {
        /// The transport that lost connectivity.
        transport: TransportType,
        /// Why the loss was detected.
        reason: String,
    },

    /// Connectivity came back after a [`SessionEvent::Disconnected`].
    Reconnected {
        /// The transport that recovered.
        transport: TransportType,
    },

    /// The active observed node changed.
    NodeChanged(NodeAddress),
}

/// An emitter for broadcasting [`SessionEvent`]s to subscribers.
///
/// The session owns one emitter and hands clones to every transport it
/// installs, so subscribers keep receiving events across transport
/// substitution.
#[derive(Debug, Clone)]
pub struct SessionEventEmitter {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventEmitter {
    /// Default channel capacity. Slow subscribers lag rather than block.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a new emitter with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a new emitter buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Emits an event. Having no subscriber is not an error.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    /// Emits a `Connected` event.
    pub fn emit_connected(&self, transport: TransportType) {
        self.emit(SessionEvent::Connected { transport });
    }

    /// Emits a `Disconnected` event.
    pub fn emit_disconnected(&self, transport: TransportType, reason: impl Into<String>) {
        self.emit(SessionEvent::Disconnected {
            transport,
            reason: reason.into(),
        });
    }

    /// Emits a `Reconnected` event.
    pub fn emit_reconnected(&self, transport: TransportType) {
        self.emit(SessionEvent::Reconnected { transport });
    }

    /// Emits a `NodeChanged` event.
    pub fn emit_node_changed(&self, node: NodeAddress) {
        self.emit(SessionEvent::NodeChanged(node));
    }
}

impl Default for SessionEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

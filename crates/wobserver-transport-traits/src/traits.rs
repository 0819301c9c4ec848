//! Core transport trait.

use std::future::Future;
use std::pin::Pin;

use crate::error::TransportResult;
use crate::message::{Command, Envelope};
use crate::metrics::TransportMetrics;
use crate::node::NodeAddress;
use crate::types::{TransportCapabilities, TransportState, TransportType};

/// The capability set every transport provides to the session.
///
/// Implementations must never queue requests they cannot serve: when the
/// transport is unable to accept a request it fails fast with
/// [`TransportError::NotConnected`](crate::TransportError::NotConnected).
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Returns the type of this transport.
    fn transport_type(&self) -> TransportType;

    /// Returns the capabilities of this transport.
    fn capabilities(&self) -> &TransportCapabilities;

    /// Returns the current state of the transport.
    fn state(&self) -> TransportState;

    /// Sends a command without waiting for its response.
    fn send(
        &self,
        command: Command,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Sends a command and waits for the envelope answering it.
    fn send_and_await(
        &self,
        command: Command,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Envelope>> + Send + '_>>;

    /// Requests that subsequent commands be routed to `node`.
    ///
    /// Whether the change is committed immediately or only once the remote side
    /// confirms it is up to the transport.
    fn switch_node(
        &self,
        node: NodeAddress,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Shuts the transport down and fails every outstanding request.
    fn close(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Returns a snapshot of the transport's counters.
    fn metrics(&self) -> TransportMetrics;

    /// Returns `true` if the transport currently accepts requests.
    fn is_open(&self) -> bool {
        self.state().accepts_requests()
    }

    /// Returns the endpoint address for this transport, if applicable.
    fn endpoint(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The session stores transports as trait objects
    fn _test_transport_object(_t: &dyn Transport) {}
    fn _test_transport_arc(_t: std::sync::Arc<dyn Transport>) {}
}

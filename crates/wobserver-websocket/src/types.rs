//! Core types and type aliases for the stream transport
//!
//! This module defines the transport handle, the state it shares with its
//! background tasks, and the stream type aliases.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use futures::stream::{SplitSink, SplitStream};
use parking_lot::{Mutex as SyncMutex, RwLock};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
use uuid::Uuid;

use wobserver_transport_traits::{
    ActiveNode, AtomicMetrics, SessionEventEmitter, TransportCapabilities, TransportState,
};

use crate::config::StreamConfig;
use crate::correlator::Correlator;

/// Client-side WebSocket stream
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
/// WebSocket write half
pub type WsSink = SplitSink<WsStream, Message>;
/// WebSocket read half
pub type WsSource = SplitStream<WsStream>;

/// The write half of one established connection.
///
/// `generation` identifies the connection so that a failure detected on a
/// stale connection cannot tear down its successor.
#[derive(Debug)]
pub(crate) struct LinkWriter {
    pub(crate) generation: u64,
    pub(crate) sink: WsSink,
}

/// Stream transport: one persistent WebSocket to the dashboard service.
///
/// All state lives behind one `Arc` that the reader, keepalive and
/// reconnection tasks hold as well. Dropping the handle stops those tasks.
#[derive(Debug)]
pub struct StreamTransport {
    pub(crate) shared: Arc<StreamShared>,
    pub(crate) capabilities: TransportCapabilities,
}

/// State shared between the transport handle and its background tasks.
#[derive(Debug)]
pub(crate) struct StreamShared {
    /// Configuration
    pub(crate) config: StreamConfig,

    /// Identifies this transport in logs
    pub(crate) session_id: String,

    /// Lifecycle state; only held for short synchronous sections
    pub(crate) state: RwLock<TransportState>,

    /// Write half of the current connection, `None` while not open
    pub(crate) writer: Mutex<Option<LinkWriter>>,

    /// Generation of the most recently established connection
    pub(crate) generation: AtomicU64,

    /// Waiters for responses
    pub(crate) correlator: Correlator,

    /// Active observed node, shared with the session
    pub(crate) node: ActiveNode,

    /// Connectivity events, shared with the session
    pub(crate) events: SessionEventEmitter,

    /// Counters
    pub(crate) metrics: AtomicMetrics,

    /// Shutdown signal broadcaster; every background task subscribes
    pub(crate) shutdown_tx: broadcast::Sender<()>,

    /// Reader and keepalive tasks of the current connection
    pub(crate) connection_tasks: SyncMutex<Vec<JoinHandle<()>>>,

    /// Recovery task running the reconnection loop, if any
    pub(crate) recovery_task: SyncMutex<Option<JoinHandle<()>>>,
}

impl StreamShared {
    pub(crate) fn new(config: StreamConfig, node: ActiveNode, events: SessionEventEmitter) -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
            state: RwLock::new(TransportState::Connecting),
            writer: Mutex::new(None),
            generation: AtomicU64::new(0),
            correlator: Correlator::new(),
            node,
            events,
            metrics: AtomicMetrics::new(),
            shutdown_tx,
            connection_tasks: SyncMutex::new(Vec::new()),
            recovery_task: SyncMutex::new(None),
        }
    }

    /// Abort the reader and keepalive tasks of the current connection.
    pub(crate) fn stop_connection_tasks(&self) {
        let handles = self.connection_tasks.lock().drain(..).collect::<Vec<_>>();
        for handle in handles {
            handle.abort();
        }
    }
}

impl StreamTransport {
    /// Create transport capabilities for the stream transport
    pub fn create_capabilities(config: &StreamConfig) -> TransportCapabilities {
        TransportCapabilities::stream(config.limits.max_response_size)
    }

    /// Get session ID
    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Current lifecycle state
    pub fn current_state(&self) -> TransportState {
        *self.shared.state.read()
    }

    /// Number of callers waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.shared.correlator.pending_count()
    }

    /// The active observed node cell
    pub fn active_node(&self) -> &ActiveNode {
        &self.shared.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_capabilities() {
        let config = StreamConfig::default().with_max_message_size(1024);
        let capabilities = StreamTransport::create_capabilities(&config);

        assert!(capabilities.supports_push);
        assert!(capabilities.supports_bidirectional);
        assert_eq!(capabilities.max_message_size, Some(1024));
    }

    #[tokio::test]
    async fn test_shared_starts_connecting() {
        let shared = StreamShared::new(
            StreamConfig::default(),
            ActiveNode::default(),
            SessionEventEmitter::new(),
        );

        assert_eq!(*shared.state.read(), TransportState::Connecting);
        assert!(shared.writer.lock().await.is_none());
        assert!(!shared.session_id.is_empty());
    }
}

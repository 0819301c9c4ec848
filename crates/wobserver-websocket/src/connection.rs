//! Connection management for the stream transport
//!
//! This module handles establishing the WebSocket, activating a fresh
//! connection (handshake, writer installation, background tasks) and the
//! explicit close path.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures::{SinkExt as _, StreamExt as _};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use wobserver_transport_traits::{
    ActiveNode, AtomicMetrics, Command, SessionEventEmitter, TransportError, TransportResult,
    TransportState,
};

use crate::config::StreamConfig;
use crate::types::{LinkWriter, StreamShared, StreamTransport, WsStream};

impl StreamTransport {
    /// Open the stream channel
    ///
    /// Connects to the configured URL, sends `hello` and starts the keepalive.
    /// On failure the error is returned and no background task is left
    /// running; callers are expected to fall back to another transport.
    ///
    /// `node` and `events` are the session-owned node cell and event channel.
    pub async fn open(
        config: StreamConfig,
        node: ActiveNode,
        events: SessionEventEmitter,
    ) -> TransportResult<Self> {
        if config.keepalive_interval.is_zero() {
            return Err(TransportError::ConfigurationError(
                "keepalive interval must be greater than zero".to_string(),
            ));
        }

        let capabilities = Self::create_capabilities(&config);
        let shared = Arc::new(StreamShared::new(config, node, events));

        let result = async {
            let url = shared.endpoint()?;
            info!(
                "Connecting to WebSocket server at {} for session {}",
                url, shared.session_id
            );
            let stream = shared.connect_stream(&url).await?;
            shared.activate(stream, TransportState::Connecting).await
        }
        .await;

        if let Err(e) = result {
            *shared.state.write() = TransportState::Closed;
            warn!(
                "Stream transport failed to open for session {}: {}",
                shared.session_id, e
            );
            return Err(e);
        }

        info!(
            "Stream transport open for session {}",
            shared.session_id
        );
        Ok(Self {
            shared,
            capabilities,
        })
    }
}

impl StreamShared {
    /// The configured WebSocket URL
    pub(crate) fn endpoint(&self) -> TransportResult<String> {
        self.config.url.clone().ok_or_else(|| {
            TransportError::ConfigurationError("No URL configured for stream transport".to_string())
        })
    }

    /// Establish one WebSocket connection, bounded by the connect timeout.
    pub(crate) async fn connect_stream(&self, url: &str) -> TransportResult<WsStream> {
        AtomicMetrics::incr(&self.metrics.connections);

        match tokio::time::timeout(self.config.connect_timeout, connect_async(url)).await {
            Ok(Ok((stream, _response))) => Ok(stream),
            Ok(Err(e)) => {
                AtomicMetrics::incr(&self.metrics.failed_connections);
                Err(TransportError::ConnectionFailed(format!(
                    "WebSocket connection failed: {}",
                    e
                )))
            }
            Err(_) => {
                AtomicMetrics::incr(&self.metrics.failed_connections);
                Err(TransportError::ConnectionTimeout {
                    operation: format!("connect {}", url),
                    timeout: self.config.connect_timeout,
                })
            }
        }
    }

    /// Turn a freshly connected stream into the live connection.
    ///
    /// `hello` goes out before the writer is published, so no command can
    /// precede the handshake. The state only moves to `Open` if it is still
    /// `expected`; a close that raced the connect wins and the stream is
    /// dropped.
    pub(crate) async fn activate(
        self: &Arc<Self>,
        stream: WsStream,
        expected: TransportState,
    ) -> TransportResult<()> {
        let (mut sink, source) = stream.split();

        let hello = Command::hello().encode()?;
        let hello_len = hello.len();
        sink.send(Message::Text(hello.into()))
            .await
            .map_err(|e| TransportError::SendFailed(format!("hello failed: {}", e)))?;
        self.metrics.record_sent(hello_len);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.writer.lock().await = Some(LinkWriter { generation, sink });

        let committed = {
            let mut state = self.state.write();
            if *state == expected {
                *state = TransportState::Open;
                true
            } else {
                false
            }
        };

        if !committed {
            self.writer.lock().await.take();
            debug!(
                "Discarding connection {} for session {}: transport closed meanwhile",
                generation, self.session_id
            );
            return Err(TransportError::NotConnected(
                "transport closed while connecting".to_string(),
            ));
        }

        let reader = self.spawn_message_reader_task(source, generation);
        let keepalive = self.spawn_keepalive_task(generation);
        self.connection_tasks.lock().extend([reader, keepalive]);

        debug!(
            "Connection {} active for session {}",
            generation, self.session_id
        );
        Ok(())
    }

    /// Explicit shutdown: stop every task, say goodbye, fail all waiters.
    pub(crate) async fn close(&self) -> TransportResult<()> {
        {
            let mut state = self.state.write();
            if matches!(*state, TransportState::Closing | TransportState::Closed) {
                return Ok(());
            }
            *state = TransportState::Closing;
        }

        info!("Closing stream transport for session {}", self.session_id);

        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.recovery_task.lock().take() {
            handle.abort();
        }
        self.stop_connection_tasks();

        let link = self.writer.lock().await.take();
        if let Some(mut link) = link
            && let Err(e) = link.sink.send(Message::Close(None)).await
        {
            debug!(
                "Close frame not delivered for session {}: {}",
                self.session_id, e
            );
        }

        self.correlator.abandon_all("transport closed");
        *self.state.write() = TransportState::Closed;

        info!("Stream transport closed for session {}", self.session_id);
        Ok(())
    }

    /// Stop background work without touching the socket. Used on drop.
    pub(crate) fn shutdown_now(&self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.recovery_task.lock().take() {
            handle.abort();
        }
        self.stop_connection_tasks();
        self.correlator.abandon_all("transport dropped");
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.shared.shutdown_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_without_url() {
        let result = StreamTransport::open(
            StreamConfig::default(),
            ActiveNode::default(),
            SessionEventEmitter::new(),
        )
        .await;

        assert!(matches!(
            result,
            Err(TransportError::ConfigurationError(ref msg)) if msg.contains("No URL")
        ));
    }

    #[tokio::test]
    async fn test_open_rejects_zero_keepalive() {
        let config =
            StreamConfig::client("ws://127.0.0.1:1/ws").with_keepalive_interval(Duration::ZERO);
        let result =
            StreamTransport::open(config, ActiveNode::default(), SessionEventEmitter::new()).await;

        assert!(matches!(
            result,
            Err(TransportError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_open_refused_connection() {
        // Bind and immediately release a port so nothing listens on it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = StreamConfig::client(format!("ws://{}/ws", addr))
            .with_connect_timeout(Duration::from_secs(2));
        let result =
            StreamTransport::open(config, ActiveNode::default(), SessionEventEmitter::new()).await;

        let err = result.unwrap_err();
        assert!(err.is_connectivity(), "unexpected error: {err}");
    }
}

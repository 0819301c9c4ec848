//! Background task management for the stream transport
//!
//! This module manages the per-connection reader and keepalive tasks, the
//! disconnect path and the reconnection loop that runs after a loss.
//!
//! ## Architecture
//!
//! The reader task is the single consumer of the WebSocket stream. Each text
//! frame is decoded into an envelope and routed:
//! 1. `ehlo` / `setup_proxy` update the active node and emit `NodeChanged`
//! 2. everything else goes to the correlator, which wakes the oldest waiter
//!
//! A loss detected by the reader, the keepalive or a failed write funnels into
//! `handle_disconnect`. Only the first detection for the live
//! connection acts on it; the recovery task it spawns owns the teardown and the
//! reconnection loop, so no task ever aborts itself.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures::{SinkExt as _, StreamExt as _};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use wobserver_transport_traits::{
    AtomicMetrics, Command, Envelope, NodeAddress, TransportError, TransportResult,
    TransportState, TransportType, validate_request_size, validate_response_size,
};

use crate::types::{StreamShared, WsSource};

impl StreamShared {
    /// Spawn the reader task for connection `generation`.
    pub(crate) fn spawn_message_reader_task(
        self: &Arc<Self>,
        mut source: WsSource,
        generation: u64,
    ) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            debug!(
                "Message reader task started for session {} (connection {})",
                shared.session_id, generation
            );

            let lost = loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Message reader received shutdown signal for session {}", shared.session_id);
                        break None;
                    }

                    frame = source.next() => { match frame {
                        Some(Ok(Message::Text(text))) => shared.dispatch_frame(text.as_str()),
                        Some(Ok(Message::Binary(data))) => {
                            trace!(
                                "Ignoring {} byte binary frame in session {}",
                                data.len(), shared.session_id
                            );
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let mut writer = shared.writer.lock().await;
                            if let Some(link) = writer.as_mut()
                                && let Err(e) = link.sink.send(Message::Pong(data)).await
                            {
                                trace!("Pong not sent in session {}: {}", shared.session_id, e);
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            trace!("Message reader received pong in session {}", shared.session_id);
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("WebSocket closed by peer in session {}", shared.session_id);
                            break Some("closed by peer".to_string());
                        }
                        Some(Ok(Message::Frame(_))) => {
                            trace!("Message reader received raw frame in session {}", shared.session_id);
                        }
                        Some(Err(e)) => {
                            warn!("WebSocket error in session {}: {}", shared.session_id, e);
                            break Some(e.to_string());
                        }
                        None => {
                            info!("WebSocket stream ended for session {}", shared.session_id);
                            break Some("stream ended".to_string());
                        }
                    } }
                }
            };

            if let Some(reason) = lost {
                shared.handle_disconnect(generation, reason);
            }

            debug!(
                "Message reader task terminated for session {} (connection {})",
                shared.session_id, generation
            );
        })
    }

    /// Spawn the keepalive task for connection `generation`.
    ///
    /// The first `ping` goes out one interval after the connection opened.
    /// The task ends as soon as its connection is no longer the open one.
    pub(crate) fn spawn_keepalive_task(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        let period = self.config.keepalive_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

            debug!(
                "Keepalive task started for session {} with interval {:?}",
                shared.session_id, period
            );

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Keepalive task received shutdown signal for session {}", shared.session_id);
                        break;
                    }

                    _ = ticker.tick() => {
                        if !shared.is_live(generation) {
                            break;
                        }

                        if let Err(e) = shared.transmit(&Command::ping()).await {
                            warn!("Keepalive ping failed for session {}: {}", shared.session_id, e);
                            break;
                        }
                        trace!("Keepalive ping sent for session {}", shared.session_id);
                    }
                }
            }

            debug!(
                "Keepalive task terminated for session {} (connection {})",
                shared.session_id, generation
            );
        })
    }

    /// Route one inbound text frame.
    pub(crate) fn dispatch_frame(&self, text: &str) {
        self.metrics.record_received(text.len());

        if let Err(e) = validate_response_size(text.len(), &self.config.limits) {
            warn!("Dropping frame in session {}: {}", self.session_id, e);
            return;
        }

        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    "Ignoring unparseable frame in session {}: {}",
                    self.session_id, e
                );
                return;
            }
        };

        if envelope.is_control() {
            self.apply_node_announcement(&envelope);
            return;
        }

        let kind = envelope.kind.clone();
        if !self.correlator.resolve(envelope) {
            AtomicMetrics::incr(&self.metrics.unmatched_envelopes);
            trace!(
                "Discarded unmatched '{}' envelope in session {}",
                kind, self.session_id
            );
        }
    }

    fn apply_node_announcement(&self, envelope: &Envelope) {
        let Some(node) = envelope.announced_node() else {
            warn!(
                "'{}' envelope without node name in session {}",
                envelope.kind, self.session_id
            );
            return;
        };

        let node = NodeAddress::new(node);
        if self.node.set(node.clone()) {
            info!(
                "Observed node is now {} (via '{}') for session {}",
                node, envelope.kind, self.session_id
            );
            self.events.emit_node_changed(node);
        } else {
            debug!(
                "Node {} confirmed again for session {}",
                node, self.session_id
            );
        }
    }

    /// Serialize `command` and write it to the live connection.
    ///
    /// A failed write starts the disconnect path before the error is returned.
    pub(crate) async fn transmit(self: &Arc<Self>, command: &Command) -> TransportResult<()> {
        let frame = command.encode()?;
        let frame_len = frame.len();
        validate_request_size(frame_len, &self.config.limits)?;

        let mut writer = self.writer.lock().await;
        let Some(link) = writer.as_mut() else {
            return Err(TransportError::NotConnected(format!(
                "stream transport is {}",
                *self.state.read()
            )));
        };

        match link.sink.send(Message::Text(frame.into())).await {
            Ok(()) => {
                self.metrics.record_sent(frame_len);
                trace!(
                    "Sent '{}' ({} bytes) in session {}",
                    command.name, frame_len, self.session_id
                );
                Ok(())
            }
            Err(e) => {
                let generation = link.generation;
                drop(writer);
                self.handle_disconnect(generation, format!("write failed: {}", e));
                Err(TransportError::SendFailed(format!(
                    "WebSocket send failed: {}",
                    e
                )))
            }
        }
    }

    /// Fail fast unless the transport accepts requests.
    pub(crate) fn ensure_open(&self) -> TransportResult<()> {
        let state = *self.state.read();
        if state.accepts_requests() {
            Ok(())
        } else {
            Err(TransportError::NotConnected(format!(
                "stream transport is {}",
                state
            )))
        }
    }

    fn is_live(&self, generation: u64) -> bool {
        *self.state.read() == TransportState::Open
            && self.generation.load(Ordering::SeqCst) == generation
    }

    /// Entry point for every connectivity loss on connection `generation`.
    ///
    /// Acts only on the first detection while that connection is open; later
    /// detections and detections on stale connections are no-ops.
    pub(crate) fn handle_disconnect(self: &Arc<Self>, generation: u64, reason: String) {
        {
            let mut state = self.state.write();
            if *state != TransportState::Open
                || self.generation.load(Ordering::SeqCst) != generation
            {
                trace!(
                    "Ignoring loss on connection {} in session {} (state {})",
                    generation, self.session_id, *state
                );
                return;
            }
            *state = TransportState::Broken;
        }

        warn!("Connection lost for session {}: {}", self.session_id, reason);

        let shared = Arc::clone(self);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move { shared.recover(reason, shutdown_rx).await });

        *self.recovery_task.lock() = Some(handle);
    }

    /// Tear down the lost connection, then reconnect until success or close.
    async fn recover(self: Arc<Self>, reason: String, mut shutdown_rx: broadcast::Receiver<()>) {
        self.stop_connection_tasks();
        drop(self.writer.lock().await.take());

        let abandoned = self.correlator.abandon_all(&reason);
        debug!(
            "Abandoned {} pending requests for session {}",
            abandoned, self.session_id
        );
        self.events
            .emit_disconnected(TransportType::Stream, reason.clone());

        {
            let mut state = self.state.write();
            if *state != TransportState::Broken {
                return;
            }
            *state = TransportState::Reconnecting;
        }

        let url = match self.endpoint() {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot reconnect session {}: {}", self.session_id, e);
                return;
            }
        };
        let delay = self.config.reconnect_delay;
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            debug!(
                "Reconnection attempt {} for session {}",
                attempt, self.session_id
            );

            let outcome = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Reconnection task received shutdown signal for session {}", self.session_id);
                    return;
                }
                outcome = self.connect_stream(&url) => outcome,
            };

            let outcome = match outcome {
                Ok(stream) => self.activate(stream, TransportState::Reconnecting).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    AtomicMetrics::incr(&self.metrics.reconnections);
                    info!(
                        "Reconnection successful for session {} after {} attempts",
                        self.session_id, attempt
                    );
                    self.events.emit_reconnected(TransportType::Stream);
                    return;
                }
                Err(e) => {
                    warn!(
                        "Reconnection attempt {} failed for session {}: {}",
                        attempt, self.session_id, e
                    );
                }
            }

            if *self.state.read() != TransportState::Reconnecting {
                return;
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Reconnection task received shutdown during backoff for session {}", self.session_id);
                    return;
                }
                _ = sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wobserver_transport_traits::{ActiveNode, SessionEvent, SessionEventEmitter};

    use crate::config::StreamConfig;

    fn shared() -> Arc<StreamShared> {
        Arc::new(StreamShared::new(
            StreamConfig::client("ws://127.0.0.1:1/ws"),
            ActiveNode::default(),
            SessionEventEmitter::new(),
        ))
    }

    #[tokio::test]
    async fn test_dispatch_resolves_waiter() {
        let shared = shared();
        let reply = shared.correlator.register("memory");

        shared.dispatch_frame(r#"{"type":"memory","data":{"total":10}}"#);

        let envelope = reply.await.unwrap();
        assert_eq!(envelope.data, json!({"total": 10}));
        assert_eq!(shared.metrics.snapshot().messages_received, 1);
    }

    #[tokio::test]
    async fn test_dispatch_counts_unmatched() {
        let shared = shared();
        shared.dispatch_frame(r#"{"type":"ping","data":"pong"}"#);
        shared.dispatch_frame("not json at all");

        let snapshot = shared.metrics.snapshot();
        assert_eq!(snapshot.unmatched_envelopes, 1);
        assert_eq!(snapshot.messages_received, 2);
    }

    #[tokio::test]
    async fn test_dispatch_control_envelope_updates_node() {
        let shared = shared();
        let mut events = shared.events.subscribe();
        let reply = shared.correlator.register("setup_proxy");

        shared.dispatch_frame(r#"{"type":"setup_proxy","data":{"node":"nodeB"}}"#);

        assert_eq!(shared.node.get(), "nodeB");
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::NodeChanged(NodeAddress::new("nodeB"))
        );
        // Control envelopes never reach the correlator
        assert_eq!(shared.correlator.pending_for("setup_proxy"), 1);
        drop(reply);
    }

    #[tokio::test]
    async fn test_repeated_announcement_emits_once() {
        let shared = shared();
        let mut events = shared.events.subscribe();

        shared.dispatch_frame(r#"{"type":"ehlo","data":{"name":"app@host"}}"#);
        shared.dispatch_frame(r#"{"type":"ehlo","data":{"name":"app@host"}}"#);

        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_rejects_oversized_frame() {
        let shared = Arc::new(StreamShared::new(
            StreamConfig::client("ws://127.0.0.1:1/ws").with_max_message_size(8),
            ActiveNode::default(),
            SessionEventEmitter::new(),
        ));
        let mut reply = tokio_test::task::spawn(shared.correlator.register("memory"));

        shared.dispatch_frame(r#"{"type":"memory","data":1}"#);
        tokio_test::assert_pending!(reply.poll());
    }

    #[tokio::test]
    async fn test_transmit_without_connection() {
        let shared = shared();
        let err = shared.transmit(&Command::ping()).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected(_)));
    }

    #[tokio::test]
    async fn test_disconnect_ignored_unless_open() {
        let shared = shared();
        shared.handle_disconnect(0, "test".to_string());

        assert_eq!(*shared.state.read(), TransportState::Connecting);
        assert!(shared.recovery_task.lock().is_none());
    }

    #[test]
    fn test_ensure_open() {
        let shared = shared();
        assert!(shared.ensure_open().is_err());

        *shared.state.write() = TransportState::Open;
        assert!(shared.ensure_open().is_ok());
    }
}

//! The session façade
//!
//! A [`Session`] owns the active transport, the active node and the event
//! channel. It is the only object the application talks to: it picks the
//! stream transport when the service accepts a WebSocket, falls back to
//! polling otherwise, and keeps subscribers attached across the swap.
//!
//! `Session` is cheaply cloneable; all clones share the same transport.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use wobserver_http::PollingTransport;
use wobserver_transport_traits::{
    ActiveNode, Command, Envelope, NodeAddress, SessionEvent, SessionEventEmitter, Transport,
    TransportError, TransportMetrics, TransportState, TransportType,
};
use wobserver_websocket::StreamTransport;

use crate::builder::SessionBuilder;
use crate::config::SessionConfig;
use crate::error::SessionResult;

struct SessionInner {
    config: SessionConfig,
    node: ActiveNode,
    events: SessionEventEmitter,
    /// At most one transport is installed; swapped under the write lock
    transport: RwLock<Option<Arc<dyn Transport>>>,
}

/// Dashboard session bound to one wobserver service
///
/// ```rust,no_run
/// use wobserver_client::Session;
///
/// # async fn example() -> wobserver_client::SessionResult<()> {
/// let session = Session::builder("localhost:4001").build();
/// let transport = session.connect().await?;
/// println!("connected over {}", transport);
///
/// let system = session.command_request("system", None).await?;
/// println!("{}", system.data);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.inner.config.host)
            .field("node", &self.inner.node.get())
            .field("transport", &self.transport_type())
            .field("state", &self.state())
            .finish()
    }
}

impl Session {
    /// Create a session. Nothing is connected until [`Session::connect`].
    pub fn new(config: SessionConfig) -> Self {
        Self::with_events(config, SessionEventEmitter::new())
    }

    pub(crate) fn with_events(config: SessionConfig, events: SessionEventEmitter) -> Self {
        let node = ActiveNode::new(config.initial_node.clone());
        Self {
            inner: Arc::new(SessionInner {
                config,
                node,
                events,
                transport: RwLock::new(None),
            }),
        }
    }

    /// Start building a session for `host`
    pub fn builder(host: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(host)
    }

    /// The session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Connect to the service.
    ///
    /// Tries the stream transport first. If it cannot be opened the failure
    /// is logged and a polling transport for the same host and node is
    /// installed instead. Emits `Connected` with the transport that won.
    ///
    /// A new stream connection starts on the local node. A configured
    /// initial node is then requested from the service and only becomes
    /// active once the service confirms it, like any [`Session::set_node`].
    /// Polling addresses the initial node straight away.
    ///
    /// Calling this again replaces (and closes) the current transport.
    pub async fn connect(&self) -> SessionResult<TransportType> {
        let inner = &self.inner;
        let initial = inner.config.initial_node.clone();

        inner.node.set(NodeAddress::local());
        match StreamTransport::open(
            inner.config.stream_config(),
            inner.node.clone(),
            inner.events.clone(),
        )
        .await
        {
            Ok(stream) => {
                info!("Connected to {} over the stream channel", inner.config.host);
                let stream: Arc<dyn Transport> = Arc::new(stream);
                self.install(Arc::clone(&stream)).await;
                inner.events.emit_connected(TransportType::Stream);

                if !initial.is_local() {
                    debug!("Requesting initial node {}", initial);
                    if let Err(e) = stream.switch_node(initial.clone()).await {
                        warn!("Could not request initial node {}: {}", initial, e);
                    }
                }
                Ok(TransportType::Stream)
            }
            Err(e) => {
                warn!(
                    "Stream channel to {} unavailable ({}), falling back to polling",
                    inner.config.host, e
                );
                inner.node.set(initial);
                self.install_polling().await?;
                Ok(TransportType::Polling)
            }
        }
    }

    /// Replace the active transport with a polling transport.
    ///
    /// Requests in flight on the old transport fail; they are not replayed.
    pub async fn fall_back_to_polling(&self) -> SessionResult<()> {
        self.install_polling().await
    }

    async fn install_polling(&self) -> SessionResult<()> {
        let inner = &self.inner;
        let polling = PollingTransport::new(
            inner.config.polling_config(),
            inner.node.clone(),
            inner.events.clone(),
        )?;

        info!(
            "Polling {} for node {}",
            polling.config().base_url,
            inner.node.get()
        );
        self.install(Arc::new(polling)).await;
        inner.events.emit_connected(TransportType::Polling);
        Ok(())
    }

    async fn install(&self, transport: Arc<dyn Transport>) {
        let previous = self.inner.transport.write().replace(transport);
        if let Some(previous) = previous {
            debug!(
                "Closing replaced {} transport",
                previous.transport_type()
            );
            if let Err(e) = previous.close().await {
                debug!("Replaced transport did not close cleanly: {}", e);
            }
        }
    }

    fn active(&self) -> Result<Arc<dyn Transport>, TransportError> {
        self.inner.transport.read().clone().ok_or_else(|| {
            TransportError::NotConnected("session has no transport installed".to_string())
        })
    }

    /// Send a command without waiting for its response.
    ///
    /// Over polling there is no separate send path: this performs the whole
    /// `GET` round trip, discards the body and returns the exchange error,
    /// if any.
    pub async fn command(&self, name: &str, payload: Option<Value>) -> SessionResult<()> {
        let transport = self.active()?;
        transport.send(build_command(name, payload)).await?;
        Ok(())
    }

    /// Send a command and wait for the envelope answering it.
    ///
    /// Fails with `NotConnected` instead of waiting when there is no
    /// transport or it cannot take requests right now.
    pub async fn command_request(
        &self,
        name: &str,
        payload: Option<Value>,
    ) -> SessionResult<Envelope> {
        let transport = self.active()?;
        if !transport.is_open() {
            return Err(TransportError::NotConnected(format!(
                "{} transport is {}",
                transport.transport_type(),
                transport.state()
            ))
            .into());
        }
        Ok(transport
            .send_and_await(build_command(name, payload))
            .await?)
    }

    /// Route subsequent commands to `node`.
    ///
    /// Returns `false` without contacting the service when `node` is already
    /// active. Otherwise the switch is requested and `true` returned; when
    /// the change takes effect a `NodeChanged` event is emitted.
    pub async fn set_node(&self, node: impl Into<NodeAddress>) -> SessionResult<bool> {
        let node = node.into();
        if self.inner.node.is(&node) {
            debug!("Node {} already active", node);
            return Ok(false);
        }

        let transport = self.active()?;
        transport.switch_node(node).await?;
        Ok(true)
    }

    /// Subscribe to connectivity and node events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// The node commands are currently routed to
    pub fn node(&self) -> NodeAddress {
        self.inner.node.get()
    }

    /// Kind of the installed transport, if any
    pub fn transport_type(&self) -> Option<TransportType> {
        self.inner
            .transport
            .read()
            .as_ref()
            .map(|t| t.transport_type())
    }

    /// State of the installed transport; `Closed` when there is none
    pub fn state(&self) -> TransportState {
        self.inner
            .transport
            .read()
            .as_ref()
            .map_or(TransportState::Closed, |t| t.state())
    }

    /// Counters of the installed transport
    pub fn metrics(&self) -> Option<TransportMetrics> {
        self.inner.transport.read().as_ref().map(|t| t.metrics())
    }

    /// Close and uninstall the active transport
    pub async fn close(&self) -> SessionResult<()> {
        let transport = self.inner.transport.write().take();
        if let Some(transport) = transport {
            info!(
                "Closing {} transport to {}",
                transport.transport_type(),
                self.inner.config.host
            );
            transport.close().await?;
        }
        Ok(())
    }
}

fn build_command(name: &str, payload: Option<Value>) -> Command {
    match payload {
        Some(payload) => Command::with_payload(name, payload),
        None => Command::new(name),
    }
}

//! Polling transport implementation
//!
//! Every command is a single `GET` against the command URL. There is no
//! persistent connection: "disconnected" only means the last exchange failed,
//! and the next successful one clears it.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use reqwest::Client as HttpClient;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use wobserver_transport_traits::{
    ActiveNode, AtomicMetrics, Command, Envelope, NodeAddress, SessionEventEmitter, Transport,
    TransportCapabilities, TransportError, TransportMetrics, TransportResult, TransportState,
    TransportType, validate_response_size,
};

use crate::config::{PollingConfig, command_url};

/// One-GET-per-command transport
pub struct PollingTransport {
    config: PollingConfig,
    http_client: HttpClient,
    node: ActiveNode,
    events: SessionEventEmitter,
    connected: AtomicBool,
    closed: AtomicBool,
    capabilities: TransportCapabilities,
    metrics: AtomicMetrics,
}

impl std::fmt::Debug for PollingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingTransport")
            .field("base_url", &self.config.base_url)
            .field("node", &self.node.get())
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl PollingTransport {
    /// Create a polling transport.
    ///
    /// No request is made here; the transport starts out connected and
    /// learns otherwise from the first failing exchange.
    pub fn new(
        config: PollingConfig,
        node: ActiveNode,
        events: SessionEventEmitter,
    ) -> TransportResult<Self> {
        url::Url::parse(&config.base_url).map_err(|e| {
            TransportError::ConfigurationError(format!(
                "invalid base URL '{}': {}",
                config.base_url, e
            ))
        })?;

        let mut builder = HttpClient::builder()
            .use_rustls_tls()
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http_client = builder.build().map_err(|e| {
            TransportError::ConfigurationError(format!("failed to build HTTP client: {}", e))
        })?;

        let capabilities = TransportCapabilities::polling(config.limits.max_response_size);

        Ok(Self {
            config,
            http_client,
            node,
            events,
            connected: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            capabilities,
            metrics: AtomicMetrics::new(),
        })
    }

    /// The transport configuration
    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Whether the last exchange succeeded
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// The node requests are currently routed to
    pub fn active_node(&self) -> NodeAddress {
        self.node.get()
    }

    async fn exchange(&self, command: &Command) -> TransportResult<Envelope> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected(
                "polling transport closed".to_string(),
            ));
        }
        if command.payload.is_some() {
            trace!(
                "Payload of '{}' not sent: polling requests carry none",
                command.name
            );
        }

        let url = command_url(&self.config.base_url, &self.node.get(), &command.name);
        let started = Instant::now();

        match self.fetch(&url).await {
            Ok(data) => {
                self.metrics
                    .update_latency_us(started.elapsed().as_micros() as u64);
                self.mark_success();
                Ok(Envelope::new(command.name.clone(), data))
            }
            Err(e) => {
                AtomicMetrics::incr(&self.metrics.failed_exchanges);
                self.mark_failure(&e);
                Err(e)
            }
        }
    }

    async fn fetch(&self, url: &str) -> TransportResult<Value> {
        debug!("GET {}", url);
        self.metrics.record_sent(url.len());

        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::ConnectionTimeout {
                        operation: format!("GET {}", url),
                        timeout: self.config.timeout,
                    }
                } else {
                    TransportError::ConnectionFailed(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        // Reject early when the server announces the length
        if let Some(length) = response.content_length() {
            validate_response_size(length as usize, &self.config.limits)?;
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::ConnectionLost(format!("reading body failed: {}", e)))?;
        validate_response_size(body.len(), &self.config.limits)?;
        self.metrics.record_received(body.len());

        serde_json::from_slice(&body).map_err(|e| {
            TransportError::ProtocolError(format!("response body is not JSON: {}", e))
        })
    }

    fn mark_failure(&self, error: &TransportError) {
        if self.connected.swap(false, Ordering::SeqCst) {
            warn!("Polling exchange with {} failed: {}", self.config.base_url, error);
            self.events
                .emit_disconnected(TransportType::Polling, error.to_string());
        } else {
            debug!("Polling exchange still failing: {}", error);
        }
    }

    fn mark_success(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            info!("Polling exchanges with {} recovered", self.config.base_url);
            AtomicMetrics::incr(&self.metrics.reconnections);
            self.events.emit_reconnected(TransportType::Polling);
        }
    }
}

impl Transport for PollingTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Polling
    }

    fn capabilities(&self) -> &TransportCapabilities {
        &self.capabilities
    }

    fn state(&self) -> TransportState {
        if self.closed.load(Ordering::SeqCst) {
            TransportState::Closed
        } else if self.is_connected() {
            TransportState::Open
        } else {
            TransportState::Broken
        }
    }

    fn is_open(&self) -> bool {
        // A broken polling transport still accepts requests: the next one may succeed
        !self.closed.load(Ordering::SeqCst)
    }

    fn send(
        &self,
        command: Command,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move { self.exchange(&command).await.map(|_| ()) })
    }

    fn send_and_await(
        &self,
        command: Command,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Envelope>> + Send + '_>> {
        Box::pin(async move { self.exchange(&command).await })
    }

    fn switch_node(
        &self,
        node: NodeAddress,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if self.node.set(node.clone()) {
                info!("Polling requests now routed to node {}", node);
                self.events.emit_node_changed(node);
            }
            Ok(())
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if !self.closed.swap(true, Ordering::SeqCst) {
                debug!("Polling transport for {} closed", self.config.base_url);
            }
            Ok(())
        })
    }

    fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.config.base_url.clone())
    }
}

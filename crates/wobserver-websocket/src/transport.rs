//! Transport trait implementation for the stream transport
//!
//! Requests are only accepted while the channel is `Open`. Anything issued
//! while the connection is broken or being re-established fails immediately
//! with `NotConnected` instead of being queued.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use tracing::debug;

use wobserver_transport_traits::{
    Command, Envelope, NodeAddress, Transport, TransportCapabilities, TransportMetrics,
    TransportResult, TransportState, TransportType,
};

use crate::types::StreamTransport;

impl Transport for StreamTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Stream
    }

    fn capabilities(&self) -> &TransportCapabilities {
        &self.capabilities
    }

    fn state(&self) -> TransportState {
        *self.shared.state.read()
    }

    fn send(
        &self,
        command: Command,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.shared.ensure_open()?;
            self.shared.transmit(&command).await
        })
    }

    fn send_and_await(
        &self,
        command: Command,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Envelope>> + Send + '_>> {
        Box::pin(async move {
            self.shared.ensure_open()?;

            // Register before transmitting so a fast response cannot be missed
            let reply = self.shared.correlator.register(&command.name);
            let started = Instant::now();

            if let Err(e) = self.shared.transmit(&command).await {
                self.shared.correlator.cancel(reply.name(), reply.id());
                return Err(e);
            }

            let envelope = reply.await?;
            self.shared
                .metrics
                .update_latency_us(started.elapsed().as_micros() as u64);
            Ok(envelope)
        })
    }

    fn switch_node(
        &self,
        node: NodeAddress,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.shared.ensure_open()?;
            debug!(
                "Requesting switch to node {} for session {}",
                node, self.shared.session_id
            );
            // Committed by the reader once the confirming envelope arrives
            self.shared.transmit(&Command::setup_proxy(node.as_str())).await
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(self.shared.close())
    }

    fn metrics(&self) -> TransportMetrics {
        self.shared.metrics.snapshot()
    }

    fn endpoint(&self) -> Option<String> {
        self.shared.config.url.clone()
    }
}

//! Session builder
//!
//! Fluent construction of a [`Session`] without spelling out the nested
//! transport configs.

use std::time::Duration;

use wobserver_transport_traits::{NodeAddress, SessionEventEmitter};

use crate::config::SessionConfig;
use crate::error::SessionResult;
use crate::session::Session;

/// Builder for [`Session`]
///
/// ```rust,no_run
/// use std::time::Duration;
/// use wobserver_client::Session;
///
/// # async fn example() -> wobserver_client::SessionResult<()> {
/// let session = Session::builder("example.com/wobserver")
///     .secure(true)
///     .node("worker@10.0.0.2")
///     .keepalive_interval(Duration::from_secs(10))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    config: SessionConfig,
    event_capacity: usize,
}

impl SessionBuilder {
    /// Start from the defaults for `host`
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: SessionConfig::new(host),
            event_capacity: SessionEventEmitter::DEFAULT_CAPACITY,
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: SessionConfig) -> Self {
        Self {
            config,
            event_capacity: SessionEventEmitter::DEFAULT_CAPACITY,
        }
    }

    /// Use `wss://` and `https://`
    pub fn secure(mut self, secure: bool) -> Self {
        self.config.secure = secure;
        self
    }

    /// Initial node
    pub fn node(mut self, node: impl Into<NodeAddress>) -> Self {
        self.config.initial_node = node.into();
        self
    }

    /// Interval between stream keepalive pings
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.stream.keepalive_interval = interval;
        self
    }

    /// Delay between stream reconnection attempts
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.stream.reconnect_delay = delay;
        self
    }

    /// Timeout for each stream connection attempt
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.stream.connect_timeout = timeout;
        self
    }

    /// Timeout for each polling request
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.polling.timeout = timeout;
        self
    }

    /// Largest inbound frame or response body accepted by either transport
    pub fn max_message_size(mut self, max: usize) -> Self {
        self.config.stream.limits.max_response_size = Some(max);
        self.config.polling.limits.max_response_size = Some(max);
        self
    }

    /// Events buffered per subscriber before slow ones start lagging
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Build an unconnected session
    pub fn build(self) -> Session {
        Session::with_events(
            self.config,
            SessionEventEmitter::with_capacity(self.event_capacity),
        )
    }

    /// Build the session and connect it
    pub async fn connect(self) -> SessionResult<Session> {
        let session = self.build();
        session.connect().await?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_settings() {
        let session = SessionBuilder::new("localhost:4001")
            .secure(true)
            .node("worker@host")
            .keepalive_interval(Duration::from_secs(2))
            .reconnect_delay(Duration::from_millis(250))
            .request_timeout(Duration::from_secs(3))
            .max_message_size(4096)
            .build();

        let config = session.config();
        assert!(config.secure);
        assert_eq!(session.node(), "worker@host");
        assert_eq!(config.stream.keepalive_interval, Duration::from_secs(2));
        assert_eq!(config.stream.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.polling.timeout, Duration::from_secs(3));
        assert_eq!(config.stream.limits.max_response_size, Some(4096));
        assert_eq!(config.polling.limits.max_response_size, Some(4096));
    }
}

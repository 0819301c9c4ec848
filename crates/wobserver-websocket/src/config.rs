//! Configuration types for the stream transport
//!
//! This module provides the configuration structure for the persistent
//! WebSocket channel: endpoint, keepalive cadence, reconnection backoff and
//! size limits.

use std::time::Duration;

use wobserver_transport_traits::LimitsConfig;

/// Path of the stream endpoint below the service host.
pub const STREAM_PATH: &str = "/ws";

/// Configuration for the stream transport
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// WebSocket URL to connect to, e.g. `ws://localhost:4001/ws`
    pub url: Option<String>,

    /// Interval between `ping` commands while the channel is open (default: 15s)
    pub keepalive_interval: Duration,

    /// Fixed delay between reconnection attempts (default: 5s)
    pub reconnect_delay: Duration,

    /// Upper bound for establishing one connection, handshake included (default: 10s)
    pub connect_timeout: Duration,

    /// Frame size limits
    pub limits: LimitsConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: None,
            keepalive_interval: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            limits: LimitsConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create client configuration with URL
    pub fn client(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Create client configuration for the service at `host`
    ///
    /// `host` may carry a path prefix (`localhost:4000/wobserver`) when the
    /// service is mounted below the root.
    pub fn for_host(host: &str, secure: bool) -> Self {
        Self::client(stream_url(host, secure))
    }

    /// Set keepalive interval
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Set the delay between reconnection attempts
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set frame size limits
    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Set maximum inbound frame size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.limits.max_response_size = Some(size);
        self
    }
}

/// Builds `ws[s]://<host>/ws`.
pub fn stream_url(host: &str, secure: bool) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    format!("{}://{}{}", scheme, host.trim_end_matches('/'), STREAM_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert!(config.url.is_none());
        assert_eq!(config.keepalive_interval, Duration::from_secs(15));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_stream_url() {
        assert_eq!(stream_url("localhost:4001", false), "ws://localhost:4001/ws");
        assert_eq!(
            stream_url("example.com/wobserver/", true),
            "wss://example.com/wobserver/ws"
        );
    }

    #[test]
    fn test_builder() {
        let config = StreamConfig::for_host("localhost:4001", false)
            .with_keepalive_interval(Duration::from_millis(50))
            .with_reconnect_delay(Duration::from_millis(20))
            .with_max_message_size(1024);

        assert_eq!(config.url.as_deref(), Some("ws://localhost:4001/ws"));
        assert_eq!(config.keepalive_interval, Duration::from_millis(50));
        assert_eq!(config.reconnect_delay, Duration::from_millis(20));
        assert_eq!(config.limits.max_response_size, Some(1024));
    }
}

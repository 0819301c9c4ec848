//! Session configuration
//!
//! The host is the single source of truth for both endpoints: the stream
//! URL and the polling base URL are derived from it (and the `secure` flag)
//! whenever a transport is created.

use wobserver_http::PollingConfig;
use wobserver_transport_traits::NodeAddress;
use wobserver_websocket::{StreamConfig, stream_url};

/// Configuration for a [`Session`](crate::Session)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Service host, optionally with a path prefix, e.g. `localhost:4001`
    /// or `example.com/wobserver`
    pub host: String,

    /// Use `wss://` and `https://`
    pub secure: bool,

    /// Node requested right after connecting; confirmed by the service on
    /// the stream transport
    pub initial_node: NodeAddress,

    /// Stream transport tuning; the URL is overridden from `host`
    pub stream: StreamConfig,

    /// Polling transport tuning; the base URL is overridden from `host`
    pub polling: PollingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("localhost:4001")
    }
}

impl SessionConfig {
    /// Create a configuration for `host` with default timings
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            secure: false,
            initial_node: NodeAddress::local(),
            stream: StreamConfig::default(),
            polling: PollingConfig::default(),
        }
    }

    /// Use TLS for both transports
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Route commands to `node` from the start
    #[must_use]
    pub fn with_initial_node(mut self, node: impl Into<NodeAddress>) -> Self {
        self.initial_node = node.into();
        self
    }

    /// Replace the stream transport settings
    #[must_use]
    pub fn with_stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    /// Replace the polling transport settings
    #[must_use]
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Effective stream configuration
    pub fn stream_config(&self) -> StreamConfig {
        let mut config = self.stream.clone();
        config.url = Some(stream_url(&self.host, self.secure));
        config
    }

    /// Effective polling configuration
    pub fn polling_config(&self) -> PollingConfig {
        let mut config = self.polling.clone();
        config.base_url = PollingConfig::for_host(&self.host, self.secure).base_url;
        config
    }
}

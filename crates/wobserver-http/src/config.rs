//! Polling transport configuration and URL construction

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use wobserver_transport_traits::{LimitsConfig, NodeAddress};

/// Path under which the service answers polling requests
pub const API_PATH: &str = "/api";

/// Characters left untouched by `encodeURIComponent`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Configuration for the polling transport
#[derive(Clone, Debug)]
pub struct PollingConfig {
    /// Base URL, e.g. `http://localhost:4001` (may include a path prefix)
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: Option<String>,

    /// Response size limits
    pub limits: LimitsConfig,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4001".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: Some(format!("wobserver-client/{}", env!("CARGO_PKG_VERSION"))),
            limits: LimitsConfig::default(),
        }
    }
}

impl PollingConfig {
    /// Create a config for an explicit base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Create a config for `host`, using `https` when `secure`
    pub fn for_host(host: &str, secure: bool) -> Self {
        let scheme = if secure { "https" } else { "http" };
        Self::new(format!("{}://{}", scheme, host.trim_end_matches('/')))
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent, or `None` to send reqwest's default
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Set request/response limits
    #[must_use]
    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Cap the accepted response body size
    #[must_use]
    pub fn with_max_response_size(mut self, max: usize) -> Self {
        self.limits.max_response_size = Some(max);
        self
    }
}

/// Percent-encode one path segment the way `encodeURIComponent` does.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, COMPONENT).to_string()
}

/// Build the URL a command is fetched from.
///
/// `/api/<command>` for the local node, `/api/<node>/<command>` otherwise.
pub fn command_url(base_url: &str, node: &NodeAddress, command: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if node.is_local() {
        format!("{}{}/{}", base, API_PATH, encode_segment(command))
    } else {
        format!(
            "{}{}/{}/{}",
            base,
            API_PATH,
            encode_segment(node.as_str()),
            encode_segment(command)
        )
    }
}

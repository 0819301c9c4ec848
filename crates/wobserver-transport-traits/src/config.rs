//! Transport configuration types shared by both transports.

use serde::{Deserialize, Serialize};

/// Configuration for request and response size limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum response body (or inbound frame) size in bytes.
    /// `None` = unlimited
    pub max_response_size: Option<usize>,

    /// Maximum request size in bytes.
    /// `None` = unlimited
    pub max_request_size: Option<usize>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_response_size: Some(16 * 1024 * 1024), // 16MB, process tables get large
            max_request_size: Some(1024 * 1024),       // 1MB
        }
    }
}

impl LimitsConfig {
    /// Create a configuration with no limits.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_response_size: None,
            max_request_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_deserialize_partial() {
        let limits: LimitsConfig =
            serde_json::from_str(r#"{"max_response_size":1024,"max_request_size":null}"#).unwrap();
        assert_eq!(limits.max_response_size, Some(1024));
        assert_eq!(limits.max_request_size, None);
    }
}

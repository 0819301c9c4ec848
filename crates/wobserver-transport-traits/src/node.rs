//! Observed-node addressing.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Identifies which observed node commands are routed to.
///
/// [`NodeAddress::LOCAL`] is the node the session is directly attached to;
/// any other value names a remote node proxied through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAddress(String);

impl NodeAddress {
    /// Wire value of the directly-attached node.
    pub const LOCAL: &'static str = "local";

    /// Creates an address from any node name.
    pub fn new(node: impl Into<String>) -> Self {
        Self(node.into())
    }

    /// The directly-attached node.
    pub fn local() -> Self {
        Self(Self::LOCAL.to_string())
    }

    /// Returns `true` when commands go to the directly-attached node.
    pub fn is_local(&self) -> bool {
        self.0 == Self::LOCAL
    }

    /// The node name as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeAddress {
    fn default() -> Self {
        Self::local()
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeAddress {
    fn from(node: &str) -> Self {
        Self::new(node)
    }
}

impl From<String> for NodeAddress {
    fn from(node: String) -> Self {
        Self(node)
    }
}

impl PartialEq<str> for NodeAddress {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeAddress {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The single active [`NodeAddress`] of a session.
///
/// The session owns the cell and lends clones to the transport it installs:
/// the stream transport commits confirmed switches into it and the polling
/// transport reads it to build request URLs.
#[derive(Debug, Clone, Default)]
pub struct ActiveNode {
    inner: Arc<RwLock<NodeAddress>>,
}

impl ActiveNode {
    /// Creates a cell holding `initial`.
    pub fn new(initial: NodeAddress) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Snapshot of the active address.
    pub fn get(&self) -> NodeAddress {
        self.inner.read().clone()
    }

    /// Replaces the active address. Returns `false` when `node` was already
    /// active.
    pub fn set(&self, node: NodeAddress) -> bool {
        let mut current = self.inner.write();
        if *current == node {
            return false;
        }
        *current = node;
        true
    }

    /// Returns `true` when `node` is the active address.
    pub fn is(&self, node: &NodeAddress) -> bool {
        *self.inner.read() == *node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_local() {
        let node = NodeAddress::default();
        assert!(node.is_local());
        assert_eq!(node, "local");
        assert_eq!(node.to_string(), "local");
    }

    #[test]
    fn test_active_node_set_reports_change() {
        let active = ActiveNode::default();
        assert!(!active.set(NodeAddress::local()));
        assert!(active.set(NodeAddress::new("worker@host")));
        assert!(!active.set(NodeAddress::new("worker@host")));
        assert_eq!(active.get(), "worker@host");
    }

    #[test]
    fn test_active_node_clones_share_state() {
        let active = ActiveNode::default();
        let lent = active.clone();
        lent.set("nodeB".into());
        assert!(active.is(&NodeAddress::new("nodeB")));
    }

    #[test]
    fn test_node_address_serializes_as_string() {
        let json = serde_json::to_string(&NodeAddress::new("a@b")).unwrap();
        assert_eq!(json, r#""a@b""#);
    }
}

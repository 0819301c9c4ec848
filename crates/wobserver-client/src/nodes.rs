//! Node discovery

use serde::{Deserialize, Serialize};

use wobserver_transport_traits::NodeAddress;

use crate::error::{SessionError, SessionResult};
use crate::session::Session;

/// Command listing the nodes the service can proxy to
pub const NODES_COMMAND: &str = "nodes";

/// One entry of the `nodes` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node name, usable as a [`NodeAddress`]
    pub name: String,

    /// Host the node runs on
    pub host: String,

    /// Port the node's wobserver listens on
    pub port: u16,

    /// Whether this is the node the service itself runs on
    #[serde(rename = "local?", default)]
    pub local: bool,
}

impl NodeInfo {
    /// Address routing commands to this node
    pub fn address(&self) -> NodeAddress {
        NodeAddress::new(self.name.clone())
    }

    /// Whether `active` points at this node
    pub fn is_active(&self, active: &NodeAddress) -> bool {
        *active == *self.name || (self.local && active.is_local())
    }
}

impl Session {
    /// Fetch the nodes the service knows about
    pub async fn nodes(&self) -> SessionResult<Vec<NodeInfo>> {
        let envelope = self.command_request(NODES_COMMAND, None).await?;
        serde_json::from_value(envelope.data).map_err(|source| SessionError::Decode {
            command: NODES_COMMAND.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_node_list() {
        let nodes: Vec<NodeInfo> = serde_json::from_value(json!([
            {"name": "main@10.0.0.1", "host": "10.0.0.1", "port": 4001, "local?": true},
            {"name": "worker@10.0.0.2", "host": "10.0.0.2", "port": 4001, "local?": false}
        ]))
        .unwrap();

        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].local);
        assert_eq!(nodes[1].address(), "worker@10.0.0.2");
    }

    #[test]
    fn test_is_active() {
        let main = NodeInfo {
            name: "main@10.0.0.1".into(),
            host: "10.0.0.1".into(),
            port: 4001,
            local: true,
        };
        let worker = NodeInfo {
            name: "worker@10.0.0.2".into(),
            host: "10.0.0.2".into(),
            port: 4001,
            local: false,
        };

        assert!(main.is_active(&NodeAddress::local()));
        assert!(!worker.is_active(&NodeAddress::local()));
        assert!(worker.is_active(&worker.address()));
    }
}

//! Description of a simulated system.

use serde::{Deserialize, Serialize};
use storage_network::{network::Network, node::Node};

use crate::error::ConfigError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    pub cpu_capacity: u32,
    /// Bytes.
    pub memory_capacity: u64,
    /// Bytes.
    pub storage_capacity: u64,
    /// Bits/sec.
    pub bandwidth_capacity: u64,
}

/// Bidirectional link between two nodes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkConfig {
    pub from: String,
    pub to: String,
    /// Bits/sec.
    pub bandwidth: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemConfig {
    pub nodes: Vec<NodeConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkConfig>,
}

impl SystemConfig {
    /// Creates a network with all nodes and links of the system.
    pub fn build_network(&self) -> Result<Network, ConfigError> {
        let mut network = Network::new();
        for node in self.nodes.iter() {
            network.add_node(Node::new(
                node.name.clone(),
                node.cpu_capacity,
                node.memory_capacity,
                node.storage_capacity,
                node.bandwidth_capacity,
            ));
        }
        for link in self.links.iter() {
            network.connect(&link.from, &link.to, link.bandwidth)?;
        }
        Ok(network)
    }

    pub(crate) fn has_node(&self, name: &str) -> bool {
        self.nodes.iter().any(|node| node.name == name)
    }
}

//! Errors returned by [Network](crate::network::Network) operations.

use thiserror::Error;

use crate::node::NodeId;

/// Failure of a single network operation. None of them leave the network in an inconsistent state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Referenced node is not registered in the network.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    /// Target node can't fit the requested amount of data.
    #[error("insufficient storage on node {node}: requested {requested} bytes, {available} bytes available")]
    InsufficientStorage {
        /// Target node.
        node: NodeId,
        /// Requested space.
        requested: u64,
        /// Free space at the moment of the request.
        available: u64,
    },
    /// Node doesn't hold a file with the given name.
    #[error("file {file_name} not found on node {node}")]
    FileNotFound { node: NodeId, file_name: String },
}

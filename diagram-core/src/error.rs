//! Error types for diagram operations.

use thiserror::Error;

/// Result type for diagram operations.
pub type DiagramResult<T> = Result<T, DiagramError>;

/// Errors that can occur in diagram operations.
#[derive(Debug, Error)]
pub enum DiagramError {
    /// A node with the same id already exists.
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(String),

    /// Node not found in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Edge not found in the graph.
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    /// Interface not found on the given node.
    #[error("Interface {interface} not found on node {node}")]
    InterfaceNotFound {
        /// Node that was searched.
        node: String,
        /// Interface id that did not resolve.
        interface: String,
    },

    /// A node id may not be empty.
    #[error("Node id may not be empty")]
    EmptyNodeId,

    /// No load is awaiting a repair decision.
    #[error("No pending load to resolve")]
    NoPendingLoad,

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

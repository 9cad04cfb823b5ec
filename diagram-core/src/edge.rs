//! Bus and signal connections between blocks.
//!
//! An `Edge` references its endpoints by node and interface id, never by
//! pointer, so renaming a node id requires an explicit rewrite pass over
//! all edges (the graph performs it as part of the rename commit).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interface::InterfaceId;
use crate::node::NodeId;

/// Unique identifier for an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Create an id from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Rendering style of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Straight connector.
    #[default]
    Default,
    /// Right-angle steps.
    Step,
    /// Rounded right-angle steps.
    SmoothStep,
    /// Bezier curve.
    Bezier,
}

/// A directed connection from a source-like port to a target-like port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Edge {
    /// Unique identifier.
    pub id: EdgeId,
    /// Node owning the source port.
    pub source_node_id: NodeId,
    /// Node owning the target port.
    pub target_node_id: NodeId,
    /// Source port on the source node.
    pub source_interface_id: InterfaceId,
    /// Target port on the target node.
    pub target_interface_id: InterfaceId,
    /// Rendering style.
    #[serde(default)]
    pub edge_kind: EdgeKind,
    /// Whether the connection renders with flow animation.
    #[serde(default)]
    pub animated: bool,
}

impl Edge {
    /// Create an edge with a generated id and default style.
    #[must_use]
    pub fn new(
        source_node_id: impl Into<NodeId>,
        source_interface_id: impl Into<InterfaceId>,
        target_node_id: impl Into<NodeId>,
        target_interface_id: impl Into<InterfaceId>,
    ) -> Self {
        Self {
            id: EdgeId::generate(),
            source_node_id: source_node_id.into(),
            target_node_id: target_node_id.into(),
            source_interface_id: source_interface_id.into(),
            target_interface_id: target_interface_id.into(),
            edge_kind: EdgeKind::default(),
            animated: false,
        }
    }

    /// Set the edge id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<EdgeId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the rendering style.
    #[must_use]
    pub const fn with_kind(mut self, kind: EdgeKind) -> Self {
        self.edge_kind = kind;
        self
    }

    /// Enable flow animation.
    #[must_use]
    pub const fn animated(mut self) -> Self {
        self.animated = true;
        self
    }

    /// Swap source and target endpoints (including their ports) in place.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.source_node_id, &mut self.target_node_id);
        std::mem::swap(&mut self.source_interface_id, &mut self.target_interface_id);
    }

    /// The unordered duplicate-detection key for this edge.
    #[must_use]
    pub fn endpoint_key(&self) -> EndpointKey {
        EndpointKey::new(
            &self.source_node_id,
            &self.source_interface_id,
            &self.target_node_id,
            &self.target_interface_id,
        )
    }
}

/// Unordered key over the two `(node, interface)` endpoints of an edge.
///
/// Two edges with the same key connect the same pair of ports, in either
/// orientation; the graph never holds more than one such edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    lo: String,
    hi: String,
}

impl EndpointKey {
    /// Build the key from two endpoints; orientation does not matter.
    #[must_use]
    pub fn new(
        node_a: &NodeId,
        interface_a: &InterfaceId,
        node_b: &NodeId,
        interface_b: &InterfaceId,
    ) -> Self {
        let a = format!("{node_a}:{interface_a}");
        let b = format!("{node_b}:{interface_b}");
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_key_unordered() {
        let forward = Edge::new("a", "p1", "b", "p2");
        let backward = Edge::new("b", "p2", "a", "p1");
        assert_eq!(forward.endpoint_key(), backward.endpoint_key());

        let other = Edge::new("a", "p1", "b", "p3");
        assert_ne!(forward.endpoint_key(), other.endpoint_key());
    }

    #[test]
    fn test_reverse_swaps_both_handles() {
        let mut edge = Edge::new("a", "out", "b", "in");
        edge.reverse();
        assert_eq!(edge.source_node_id.as_str(), "b");
        assert_eq!(edge.source_interface_id.as_str(), "in");
        assert_eq!(edge.target_node_id.as_str(), "a");
        assert_eq!(edge.target_interface_id.as_str(), "out");
    }

    #[test]
    fn test_edge_kind_default() {
        let json = r#"{
            "id": "e1",
            "sourceNodeId": "a",
            "targetNodeId": "b",
            "sourceInterfaceId": "p1",
            "targetInterfaceId": "p2"
        }"#;
        let edge: Edge = serde_json::from_str(json).expect("parse");
        assert_eq!(edge.edge_kind, EdgeKind::Default);
        assert!(!edge.animated);
    }
}

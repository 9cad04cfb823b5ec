//! Canonical serialized representation of a diagram.
//!
//! The document is the form written to and read from the persistence
//! boundary. Field order is fixed by the struct definitions and arrays
//! keep insertion order, so serializing the same state always yields the
//! same string; that string equality is what the persistence layer uses
//! to skip redundant saves.

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::error::DiagramResult;
use crate::graph::Graph;
use crate::node::Node;

/// Canonical `{nodes, edges}` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagramDocument {
    /// Nodes in canvas insertion order.
    pub nodes: Vec<Node>,
    /// Edges in creation order.
    pub edges: Vec<Edge>,
}

impl DiagramDocument {
    /// An empty document (the blank canvas).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a document from the current graph state.
    #[must_use]
    pub fn from_graph(graph: &Graph) -> Self {
        let (nodes, edges) = graph.to_parts();
        Self { nodes, edges }
    }

    /// Serialize to the canonical string form.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Serialization`](crate::DiagramError::Serialization)
    /// if serialization fails.
    pub fn to_canonical_json(&self) -> DiagramResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a document from JSON.
    ///
    /// Unknown fields are rejected; callers at the load boundary treat a
    /// parse failure as an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Serialization`](crate::DiagramError::Serialization)
    /// if the content is not a well-formed document.
    pub fn from_json(json: &str) -> DiagramResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the document holds no nodes and no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

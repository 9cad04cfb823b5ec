//! Connection validation: direction rules, duplicate detection, and the
//! load-time audit/repair workflow.
//!
//! Every edge must flow from a source-like port to a target-like port
//! and no two edges may connect the same pair of ports. New connections
//! are normalized (swapped when drawn backwards) before they reach the
//! graph; edges arriving from a loaded document are audited in bulk and,
//! when violations are found, surfaced as an explicit repair decision
//! rather than an error.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::edge::{Edge, EdgeKind, EndpointKey};
use crate::error::{DiagramError, DiagramResult};
use crate::graph::Graph;
use crate::interface::{InterfaceId, PortRole};
use crate::node::{Node, NodeId};

/// How a proposed connection relates to the canonical orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFit {
    /// Already flows source-like to target-like.
    Forward,
    /// Flows backwards; swapping the endpoints fixes it.
    Swapped,
    /// Both endpoints are the same strict category; no orientation is
    /// valid.
    Incompatible,
}

/// Decide the canonical orientation for a pair of port roles.
///
/// The swap rule: a strictly target-like proposed source, or a strictly
/// source-like proposed target, flips the connection. Bidirectional
/// endpoints adapt to the opposite side and never trigger a swap by
/// themselves.
#[must_use]
pub const fn orient(source: PortRole, target: PortRole) -> ConnectionFit {
    match (source, target) {
        (PortRole::Source, PortRole::Source) | (PortRole::Target, PortRole::Target) => {
            ConnectionFit::Incompatible
        }
        (PortRole::Target, _) | (_, PortRole::Source) => ConnectionFit::Swapped,
        _ => ConnectionFit::Forward,
    }
}

/// A connect gesture as drawn by the user, before normalization.
#[derive(Debug, Clone)]
pub struct ConnectionCandidate {
    /// Node the gesture started from.
    pub source_node: NodeId,
    /// Port the gesture started from.
    pub source_interface: InterfaceId,
    /// Node the gesture ended on.
    pub target_node: NodeId,
    /// Port the gesture ended on.
    pub target_interface: InterfaceId,
    /// Requested rendering style.
    pub kind: EdgeKind,
}

impl ConnectionCandidate {
    /// Describe a gesture between two ports with the default style.
    #[must_use]
    pub fn new(
        source_node: impl Into<NodeId>,
        source_interface: impl Into<InterfaceId>,
        target_node: impl Into<NodeId>,
        target_interface: impl Into<InterfaceId>,
    ) -> Self {
        Self {
            source_node: source_node.into(),
            source_interface: source_interface.into(),
            target_node: target_node.into(),
            target_interface: target_interface.into(),
            kind: EdgeKind::default(),
        }
    }

    /// Set the rendering style.
    #[must_use]
    pub const fn with_kind(mut self, kind: EdgeKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Outcome of planning a connect gesture against the current graph.
#[derive(Debug, Clone)]
pub enum ConnectionPlan {
    /// Gesture is valid; add this (possibly swapped) edge to the graph.
    Connect(Edge),
    /// An edge between the same pair of ports already exists.
    Duplicate,
    /// Both endpoints are the same strict category; no edge can be made.
    Incompatible,
}

/// Validate and normalize a connect gesture.
///
/// Resolves both endpoints, decides orientation via [`orient`], swaps
/// source and target if the gesture was drawn backwards, and checks the
/// unordered endpoint key against every existing edge.
///
/// # Errors
///
/// Returns [`DiagramError::NodeNotFound`] or
/// [`DiagramError::InterfaceNotFound`] if an endpoint does not resolve.
pub fn plan_connection(graph: &Graph, candidate: &ConnectionCandidate) -> DiagramResult<ConnectionPlan> {
    let source = graph
        .resolve_interface(&candidate.source_node, &candidate.source_interface)
        .ok_or_else(|| endpoint_error(graph, &candidate.source_node, &candidate.source_interface))?;
    let target = graph
        .resolve_interface(&candidate.target_node, &candidate.target_interface)
        .ok_or_else(|| endpoint_error(graph, &candidate.target_node, &candidate.target_interface))?;

    let fit = orient(source.role(), target.role());
    if fit == ConnectionFit::Incompatible {
        return Ok(ConnectionPlan::Incompatible);
    }

    let key = EndpointKey::new(
        &candidate.source_node,
        &candidate.source_interface,
        &candidate.target_node,
        &candidate.target_interface,
    );
    if graph.edges().any(|e| e.endpoint_key() == key) {
        return Ok(ConnectionPlan::Duplicate);
    }

    let mut edge = Edge::new(
        candidate.source_node.clone(),
        candidate.source_interface.clone(),
        candidate.target_node.clone(),
        candidate.target_interface.clone(),
    )
    .with_kind(candidate.kind);
    if fit == ConnectionFit::Swapped {
        edge.reverse();
    }
    Ok(ConnectionPlan::Connect(edge))
}

fn endpoint_error(graph: &Graph, node: &NodeId, interface: &InterfaceId) -> DiagramError {
    if graph.contains_node(node) {
        DiagramError::InterfaceNotFound {
            node: node.to_string(),
            interface: interface.to_string(),
        }
    } else {
        DiagramError::NodeNotFound(node.to_string())
    }
}

/// Why an edge failed the load-time audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidEdgeReason {
    /// Exactly backwards: swapping source and target fixes it.
    Reversed,
    /// Both endpoints are the same strict category: only removal fixes it.
    Incompatible,
}

/// One edge that failed the audit, with enough detail for a decision UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidEdge {
    /// The offending edge as loaded.
    pub edge: Edge,
    /// Classification of the violation.
    pub reason: InvalidEdgeReason,
    /// Human-readable description with endpoint labels and handle ids.
    pub detail: String,
}

/// Result of auditing a batch of loaded edges.
#[derive(Debug, Clone, Default)]
pub struct EdgeAudit {
    /// Edges that passed every check, first-occurrence order.
    pub valid: Vec<Edge>,
    /// Edges that violate the direction rules.
    pub invalid: Vec<InvalidEdge>,
    /// Edges dropped because an earlier edge had the same endpoint key.
    pub duplicates_dropped: usize,
    /// Edges dropped because an endpoint did not resolve.
    pub dangling_dropped: usize,
}

impl EdgeAudit {
    /// Whether every edge survived untouched.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.duplicates_dropped == 0 && self.dangling_dropped == 0
    }
}

/// Audit a batch of edges loaded from a document.
///
/// Deduplicates by unordered endpoint key (first occurrence wins), drops
/// edges whose endpoints do not resolve against `nodes`, and partitions
/// the remainder into valid edges and violations tagged `reversed` or
/// `incompatible`.
#[must_use]
pub fn audit_edges(nodes: &[Node], edges: Vec<Edge>) -> EdgeAudit {
    let by_id: HashMap<&NodeId, &Node> = nodes.iter().map(|n| (&n.id, n)).collect();
    let mut seen: HashSet<EndpointKey> = HashSet::new();
    let mut audit = EdgeAudit::default();

    for edge in edges {
        if !seen.insert(edge.endpoint_key()) {
            audit.duplicates_dropped += 1;
            tracing::debug!("Dropping duplicate edge {} during load", edge.id);
            continue;
        }

        let source = by_id
            .get(&edge.source_node_id)
            .and_then(|n| n.interface(&edge.source_interface_id));
        let target = by_id
            .get(&edge.target_node_id)
            .and_then(|n| n.interface(&edge.target_interface_id));
        let (Some(source), Some(target)) = (source, target) else {
            audit.dangling_dropped += 1;
            tracing::warn!(
                "Dropping edge {} with unresolvable endpoint ({} / {})",
                edge.id,
                edge.source_node_id,
                edge.target_node_id
            );
            continue;
        };

        match (source.role(), target.role()) {
            (PortRole::Target, PortRole::Source) => {
                let detail = violation_detail(&by_id, &edge, "connection is reversed");
                audit.invalid.push(InvalidEdge {
                    edge,
                    reason: InvalidEdgeReason::Reversed,
                    detail,
                });
            }
            (PortRole::Source, PortRole::Source) | (PortRole::Target, PortRole::Target) => {
                let detail = violation_detail(&by_id, &edge, "both ports have the same role");
                audit.invalid.push(InvalidEdge {
                    edge,
                    reason: InvalidEdgeReason::Incompatible,
                    detail,
                });
            }
            _ => audit.valid.push(edge),
        }
    }

    audit
}

fn violation_detail(by_id: &HashMap<&NodeId, &Node>, edge: &Edge, what: &str) -> String {
    let label = |id: &NodeId| {
        by_id
            .get(id)
            .map_or_else(|| id.to_string(), |n| n.label.clone())
    };
    format!(
        "{}: {} ({}) -> {} ({})",
        what,
        label(&edge.source_node_id),
        edge.source_interface_id,
        label(&edge.target_node_id),
        edge.target_interface_id,
    )
}

/// The caller's resolution for a load that found invalid edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepairDecision {
    /// Swap every reversed edge, drop every incompatible edge, commit.
    Repair,
    /// Drop all invalid edges, commit only the valid ones.
    Prune,
    /// Discard the entire load and keep the prior in-memory state.
    Cancel,
}

/// Summary of a load awaiting a repair decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// The violations found, with detail for the decision surface.
    pub invalid: Vec<InvalidEdge>,
    /// Count of edges that did pass the audit.
    pub valid_count: usize,
    /// Duplicates silently dropped during the audit.
    pub duplicates_dropped: usize,
    /// Dangling edges silently dropped during the audit.
    pub dangling_dropped: usize,
}

/// A document load held open until the caller decides how to repair it.
///
/// Produced when the audit finds invalid edges; consumed by
/// [`PendingLoad::resolve`]. The prior graph stays untouched until a
/// non-cancel decision commits.
#[derive(Debug, Clone)]
pub struct PendingLoad {
    nodes: Vec<Node>,
    audit: EdgeAudit,
}

impl PendingLoad {
    /// Hold a load open for a repair decision.
    #[must_use]
    pub fn new(nodes: Vec<Node>, audit: EdgeAudit) -> Self {
        Self { nodes, audit }
    }

    /// The report surfaced to the decision UI.
    #[must_use]
    pub fn report(&self) -> LoadReport {
        LoadReport {
            invalid: self.audit.invalid.clone(),
            valid_count: self.audit.valid.len(),
            duplicates_dropped: self.audit.duplicates_dropped,
            dangling_dropped: self.audit.dangling_dropped,
        }
    }

    /// Apply the caller's decision.
    ///
    /// Returns the node and edge lists to commit, or `None` when the
    /// load was cancelled.
    #[must_use]
    pub fn resolve(self, decision: RepairDecision) -> Option<(Vec<Node>, Vec<Edge>)> {
        match decision {
            RepairDecision::Cancel => None,
            RepairDecision::Prune => Some((self.nodes, self.audit.valid)),
            RepairDecision::Repair => {
                let mut edges = self.audit.valid;
                for invalid in self.audit.invalid {
                    match invalid.reason {
                        InvalidEdgeReason::Reversed => {
                            let mut edge = invalid.edge;
                            edge.reverse();
                            edges.push(edge);
                        }
                        InvalidEdgeReason::Incompatible => {
                            tracing::debug!(
                                "Dropping incompatible edge {} during repair",
                                invalid.edge.id
                            );
                        }
                    }
                }
                Some((self.nodes, edges))
            }
        }
    }
}

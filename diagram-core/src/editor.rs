//! Editor facade: gesture-level operations over the graph, validation
//! gating, history capture, dirty tracking, and change notification.
//!
//! The editor is a plain observable object: collaborators register
//! listeners through an explicit registry (no framework state, no
//! module-level globals) and every settled mutation marks the model
//! dirty, offers a candidate snapshot to history, and notifies.

use crate::document::DiagramDocument;
use crate::edge::{Edge, EdgeId};
use crate::error::{DiagramError, DiagramResult};
use crate::graph::Graph;
use crate::history::{HistoryManager, Snapshot};
use crate::node::{Node, NodeId, NodePatch};
use crate::validate::{
    audit_edges, plan_connection, ConnectionCandidate, ConnectionPlan, LoadReport, PendingLoad,
    RepairDecision,
};

/// Change notification emitted after a settled mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// A node was added.
    NodeAdded(NodeId),
    /// A node was patched (carries the id after any rename).
    NodeUpdated(NodeId),
    /// A node was removed (its edges cascaded with it).
    NodeRemoved(NodeId),
    /// A validated connection was added.
    EdgeConnected(EdgeId),
    /// An edge was removed.
    EdgeRemoved(EdgeId),
    /// The whole document was replaced by a load.
    DocumentReplaced,
    /// An undo/redo snapshot was applied.
    HistoryApplied,
}

/// Handle for unregistering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Explicit listener registry with a register/unregister lifecycle.
struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, Box<dyn Fn(&EditorEvent) + Send>)>,
}

impl ListenerRegistry {
    fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    fn register(&mut self, listener: Box<dyn Fn(&EditorEvent) + Send>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn notify(&self, event: &EditorEvent) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Outcome of a connect gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The (possibly swapped) edge was added.
    Connected(EdgeId),
    /// An edge between the same ports already exists; the gesture was
    /// silently ignored.
    DuplicateIgnored,
    /// Both ports have the same strict role; no edge was added.
    Incompatible,
}

/// Outcome of starting a document load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// No invalid edges were found; the document was applied.
    Clean,
    /// Invalid edges were found; the load is held open until
    /// [`DiagramEditor::resolve_load`] is called.
    AwaitingDecision(LoadReport),
}

/// Interactive editing session over one diagram.
#[derive(Debug)]
pub struct DiagramEditor {
    graph: Graph,
    history: HistoryManager,
    dirty: bool,
    pending_load: Option<PendingLoad>,
    listeners: ListenerRegistry,
}

impl Default for DiagramEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramEditor {
    /// Create an editor over an empty diagram.
    #[must_use]
    pub fn new() -> Self {
        let mut history = HistoryManager::new();
        history.seed(Snapshot::empty());
        Self {
            graph: Graph::new(),
            history,
            dirty: false,
            pending_load: None,
            listeners: ListenerRegistry::new(),
        }
    }

    /// The current graph state.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Whether the model has mutations not yet reflected in the last
    /// successful save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after a successful (or no-op) save.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Register a change listener. Returns the handle for
    /// [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&mut self, listener: impl Fn(&EditorEvent) + Send + 'static) -> ListenerId {
        self.listeners.register(Box::new(listener))
    }

    /// Remove a listener. Returns `false` if the handle was unknown.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    /// Add a node to the canvas.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::DuplicateNodeId`] or
    /// [`DiagramError::EmptyNodeId`] on an invalid id.
    pub fn add_node(&mut self, node: Node) -> DiagramResult<()> {
        let id = node.id.clone();
        self.graph.add_node(node)?;
        self.after_mutation(EditorEvent::NodeAdded(id));
        Ok(())
    }

    /// Patch a node (drag, resize, inspector edits, rename).
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::NodeNotFound`] for an unknown node, or a
    /// rename validation error; on error the node keeps its prior id
    /// and no edge is touched.
    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> DiagramResult<()> {
        let effective = patch.id.clone().unwrap_or_else(|| id.clone());
        self.graph.update_node(id, patch)?;
        self.after_mutation(EditorEvent::NodeUpdated(effective));
        Ok(())
    }

    /// Delete a node; edges referencing it are removed in the same
    /// commit.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::NodeNotFound`] for an unknown node.
    pub fn remove_node(&mut self, id: &NodeId) -> DiagramResult<Node> {
        let node = self.graph.remove_node(id)?;
        self.after_mutation(EditorEvent::NodeRemoved(id.clone()));
        Ok(node)
    }

    /// Remove an edge.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::EdgeNotFound`] for an unknown edge.
    pub fn remove_edge(&mut self, id: &EdgeId) -> DiagramResult<Edge> {
        let edge = self.graph.remove_edge(id)?;
        self.after_mutation(EditorEvent::EdgeRemoved(id.clone()));
        Ok(edge)
    }

    /// Handle a connect gesture.
    ///
    /// The connection is normalized (swapped when drawn backwards) so
    /// it always flows source-like to target-like. Duplicates are a
    /// normal outcome of re-dragging an existing wire and are ignored
    /// without surfacing an error.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::NodeNotFound`] or
    /// [`DiagramError::InterfaceNotFound`] if an endpoint does not
    /// resolve.
    pub fn connect(&mut self, candidate: &ConnectionCandidate) -> DiagramResult<ConnectOutcome> {
        match plan_connection(&self.graph, candidate)? {
            ConnectionPlan::Connect(edge) => {
                let id = edge.id.clone();
                self.graph.add_edge(edge)?;
                self.after_mutation(EditorEvent::EdgeConnected(id.clone()));
                Ok(ConnectOutcome::Connected(id))
            }
            ConnectionPlan::Duplicate => {
                tracing::debug!(
                    "Ignoring duplicate connection {}:{} <-> {}:{}",
                    candidate.source_node,
                    candidate.source_interface,
                    candidate.target_node,
                    candidate.target_interface
                );
                Ok(ConnectOutcome::DuplicateIgnored)
            }
            ConnectionPlan::Incompatible => {
                tracing::debug!(
                    "Rejecting same-role connection {}:{} <-> {}:{}",
                    candidate.source_node,
                    candidate.source_interface,
                    candidate.target_node,
                    candidate.target_interface
                );
                Ok(ConnectOutcome::Incompatible)
            }
        }
    }

    /// Whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one history entry. Returns `true` if a snapshot was
    /// applied.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.apply_snapshot(&snapshot);
                true
            }
            None => false,
        }
    }

    /// Step forward one history entry. Returns `true` if a snapshot was
    /// applied.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.apply_snapshot(&snapshot);
                true
            }
            None => false,
        }
    }

    /// Commit a debounced history capture whose window has elapsed.
    /// Call from the host's idle/tick handler.
    pub fn settle_history(&mut self) -> bool {
        self.history.settle()
    }

    /// Begin loading a document into this editor.
    ///
    /// A document with no invalid edges is applied immediately
    /// (`Clean`): history is reset and re-seeded, and the editor is
    /// clean unless the audit had to drop duplicate or dangling edges
    /// (the content then differs from what the store holds). A document
    /// with invalid edges is held open (`AwaitingDecision`) and the
    /// prior in-memory state stays untouched until
    /// [`resolve_load`](Self::resolve_load).
    pub fn begin_load(&mut self, document: DiagramDocument) -> LoadOutcome {
        let DiagramDocument { nodes, edges } = document;
        let audit = audit_edges(&nodes, edges);

        if audit.invalid.is_empty() {
            let cleaned = !audit.is_clean();
            self.apply_document(nodes, audit.valid, cleaned);
            return LoadOutcome::Clean;
        }

        let pending = PendingLoad::new(nodes, audit);
        let report = pending.report();
        self.pending_load = Some(pending);
        LoadOutcome::AwaitingDecision(report)
    }

    /// Resolve a load held open by [`begin_load`](Self::begin_load).
    ///
    /// `Repair` swaps every reversed edge and drops incompatibles;
    /// `Prune` keeps only valid edges; both mark the editor dirty so
    /// the cleanup persists on the next save. `Cancel` discards the
    /// load and keeps the prior state. Returns `true` when a document
    /// was applied.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::NoPendingLoad`] when no load is awaiting
    /// a decision.
    pub fn resolve_load(&mut self, decision: RepairDecision) -> DiagramResult<bool> {
        let pending = self
            .pending_load
            .take()
            .ok_or(DiagramError::NoPendingLoad)?;
        match pending.resolve(decision) {
            Some((nodes, edges)) => {
                self.apply_document(nodes, edges, true);
                Ok(true)
            }
            None => {
                tracing::debug!("Document load cancelled; prior state retained");
                Ok(false)
            }
        }
    }

    /// Whether a load is awaiting a repair decision.
    #[must_use]
    pub fn has_pending_load(&self) -> bool {
        self.pending_load.is_some()
    }

    /// The canonical document for the current state.
    #[must_use]
    pub fn document(&self) -> DiagramDocument {
        DiagramDocument::from_graph(&self.graph)
    }

    fn after_mutation(&mut self, event: EditorEvent) {
        self.dirty = true;
        self.history.capture(Snapshot::of(&self.graph));
        self.listeners.notify(&event);
    }

    fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        self.history.begin_restore();
        self.graph = Graph::from_parts(snapshot.nodes.clone(), snapshot.edges.clone());
        self.history.end_restore();
        self.dirty = true;
        self.listeners.notify(&EditorEvent::HistoryApplied);
    }

    fn apply_document(&mut self, nodes: Vec<Node>, edges: Vec<Edge>, dirty: bool) {
        self.graph = Graph::from_parts(nodes, edges);
        self.history.seed(Snapshot::of(&self.graph));
        self.dirty = dirty;
        self.pending_load = None;
        self.listeners.notify(&EditorEvent::DocumentReplaced);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::interface::{BusType, Interface, PortDirection};
    use crate::node::Position;
    use crate::validate::InvalidEdgeReason;

    fn block(id: &str, port: &str, direction: PortDirection) -> Node {
        Node::new("block", id)
            .with_id(id)
            .with_interface(Interface::new(port, BusType::Axi4, direction).with_id(port))
    }

    fn editor_with_pair() -> DiagramEditor {
        let mut editor = DiagramEditor::new();
        editor
            .add_node(block("cpu", "m_axi", PortDirection::Master))
            .expect("add cpu");
        editor
            .add_node(block("ddr", "s_axi", PortDirection::Slave))
            .expect("add ddr");
        editor
    }

    #[test]
    fn test_mutations_set_dirty_and_notify() {
        let mut editor = DiagramEditor::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        editor.subscribe(move |event| {
            sink.lock().expect("lock").push(event.clone());
        });

        assert!(!editor.is_dirty());
        editor
            .add_node(block("cpu", "m_axi", PortDirection::Master))
            .expect("add");
        assert!(editor.is_dirty());

        let seen = events.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], EditorEvent::NodeAdded(_)));
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let mut editor = DiagramEditor::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let id = editor.subscribe(move |event| {
            sink.lock().expect("lock").push(event.clone());
        });

        assert!(editor.unsubscribe(id));
        assert!(!editor.unsubscribe(id));

        editor
            .add_node(block("cpu", "m_axi", PortDirection::Master))
            .expect("add");
        assert!(events.lock().expect("lock").is_empty());
    }

    #[test]
    fn test_connect_swaps_backwards_gesture() {
        let mut editor = editor_with_pair();
        // Drawn from the slave port toward the master port.
        let outcome = editor
            .connect(&ConnectionCandidate::new("ddr", "s_axi", "cpu", "m_axi"))
            .expect("connect");
        assert!(matches!(outcome, ConnectOutcome::Connected(_)));

        let edge = editor.graph().edges().next().expect("edge");
        assert_eq!(edge.source_node_id.as_str(), "cpu");
        assert_eq!(edge.target_node_id.as_str(), "ddr");
    }

    #[test]
    fn test_duplicate_connect_is_silent_and_clean() {
        let mut editor = editor_with_pair();
        editor
            .connect(&ConnectionCandidate::new("cpu", "m_axi", "ddr", "s_axi"))
            .expect("connect");
        editor.mark_saved();

        let outcome = editor
            .connect(&ConnectionCandidate::new("ddr", "s_axi", "cpu", "m_axi"))
            .expect("re-drag");
        assert_eq!(outcome, ConnectOutcome::DuplicateIgnored);
        assert_eq!(editor.graph().edge_count(), 1);
        // A rejected duplicate is not a mutation.
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_endpoint_pair_key_invariant() {
        // No sequence of connect gestures may produce two edges over
        // the same unordered endpoint pair.
        let mut editor = editor_with_pair();
        for _ in 0..5 {
            let _ = editor
                .connect(&ConnectionCandidate::new("cpu", "m_axi", "ddr", "s_axi"))
                .expect("forward");
            let _ = editor
                .connect(&ConnectionCandidate::new("ddr", "s_axi", "cpu", "m_axi"))
                .expect("backward");
        }
        assert_eq!(editor.graph().edge_count(), 1);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut editor = editor_with_pair();
        editor
            .connect(&ConnectionCandidate::new("cpu", "m_axi", "ddr", "s_axi"))
            .expect("connect");
        assert_eq!(editor.graph().edge_count(), 1);

        assert!(editor.undo());
        assert_eq!(editor.graph().edge_count(), 0);
        assert_eq!(editor.graph().node_count(), 2);

        assert!(editor.redo());
        assert_eq!(editor.graph().edge_count(), 1);
    }

    #[test]
    fn test_undo_restore_is_not_recorded() {
        let mut editor = DiagramEditor::new();
        editor
            .add_node(block("cpu", "m_axi", PortDirection::Master))
            .expect("add");

        assert!(editor.undo());
        assert!(editor.graph().is_empty());
        // The restore itself did not create a new history entry, so
        // there is nothing further to undo.
        assert!(!editor.undo());
        assert!(editor.can_redo());
    }

    #[test]
    fn test_clean_load_resets_history_and_dirty() {
        let mut editor = editor_with_pair();
        assert!(editor.is_dirty());

        let mut source = editor_with_pair();
        source
            .connect(&ConnectionCandidate::new("cpu", "m_axi", "ddr", "s_axi"))
            .expect("connect");
        let doc = source.document();

        let outcome = editor.begin_load(doc);
        assert_eq!(outcome, LoadOutcome::Clean);
        assert!(!editor.is_dirty());
        assert_eq!(editor.graph().edge_count(), 1);
        // History was re-seeded for the new document context.
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_load_with_invalid_edges_awaits_decision() {
        let mut doc = DiagramDocument::empty();
        doc.nodes.push(block("a", "out", PortDirection::Output));
        doc.nodes.push(block("b", "out", PortDirection::Output));
        doc.edges.push(Edge::new("a", "out", "b", "out"));

        let mut editor = editor_with_pair();
        let prior_nodes = editor.graph().node_count();

        let outcome = editor.begin_load(doc);
        let LoadOutcome::AwaitingDecision(report) = outcome else {
            panic!("expected a decision point");
        };
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].reason, InvalidEdgeReason::Incompatible);

        // Prior state untouched while the decision is pending.
        assert!(editor.has_pending_load());
        assert_eq!(editor.graph().node_count(), prior_nodes);
    }

    #[test]
    fn test_prune_marks_dirty() {
        let mut doc = DiagramDocument::empty();
        doc.nodes.push(block("a", "out", PortDirection::Output));
        doc.nodes.push(block("b", "in", PortDirection::Input));
        doc.nodes.push(block("c", "out", PortDirection::Output));
        doc.edges.push(Edge::new("a", "out", "b", "in"));
        doc.edges.push(Edge::new("a", "out", "c", "out"));

        let mut editor = DiagramEditor::new();
        let LoadOutcome::AwaitingDecision(_) = editor.begin_load(doc) else {
            panic!("expected a decision point");
        };

        assert!(editor.resolve_load(RepairDecision::Prune).expect("resolve"));
        assert_eq!(editor.graph().edge_count(), 1);
        assert_eq!(editor.graph().node_count(), 3);
        assert!(editor.is_dirty());
    }

    #[test]
    fn test_repair_fixes_reversed_edge() {
        // Scenario: A.input -> B.output loads reversed; "fix
        // automatically" yields B.output -> A.input.
        let mut doc = DiagramDocument::empty();
        doc.nodes.push(block("a", "in", PortDirection::Input));
        doc.nodes.push(block("b", "out", PortDirection::Output));
        doc.edges.push(Edge::new("a", "in", "b", "out"));

        let mut editor = DiagramEditor::new();
        let LoadOutcome::AwaitingDecision(report) = editor.begin_load(doc) else {
            panic!("expected a decision point");
        };
        assert_eq!(report.invalid[0].reason, InvalidEdgeReason::Reversed);

        assert!(editor
            .resolve_load(RepairDecision::Repair)
            .expect("resolve"));
        let edge = editor.graph().edges().next().expect("edge");
        assert_eq!(edge.source_node_id.as_str(), "b");
        assert_eq!(edge.target_node_id.as_str(), "a");
        assert!(editor.is_dirty());
    }

    #[test]
    fn test_cancel_retains_prior_state() {
        let mut doc = DiagramDocument::empty();
        doc.nodes.push(block("a", "out", PortDirection::Output));
        doc.nodes.push(block("b", "out", PortDirection::Output));
        doc.edges.push(Edge::new("a", "out", "b", "out"));

        let mut editor = editor_with_pair();
        editor.mark_saved();
        let before = editor.document();

        let LoadOutcome::AwaitingDecision(_) = editor.begin_load(doc) else {
            panic!("expected a decision point");
        };
        assert!(!editor
            .resolve_load(RepairDecision::Cancel)
            .expect("resolve"));

        assert_eq!(editor.document(), before);
        assert!(!editor.is_dirty());
        assert!(!editor.has_pending_load());
    }

    #[test]
    fn test_resolve_without_pending_load_errors() {
        let mut editor = DiagramEditor::new();
        let result = editor.resolve_load(RepairDecision::Prune);
        assert!(matches!(result, Err(DiagramError::NoPendingLoad)));
    }

    #[test]
    fn test_rename_keeps_edges_valid() {
        let mut editor = editor_with_pair();
        editor
            .connect(&ConnectionCandidate::new("cpu", "m_axi", "ddr", "s_axi"))
            .expect("connect");

        editor
            .update_node(&"cpu".into(), NodePatch::rename("soc"))
            .expect("rename");

        assert!(!editor.graph().contains_node(&"cpu".into()));
        let edge = editor.graph().edges().next().expect("edge");
        assert_eq!(edge.source_node_id.as_str(), "soc");
    }

    #[test]
    fn test_drag_updates_position() {
        let mut editor = editor_with_pair();
        editor
            .update_node(&"cpu".into(), NodePatch::move_to(Position::new(300.0, 150.0)))
            .expect("drag");
        let node = editor.graph().node(&"cpu".into()).expect("node");
        assert!((node.position.x - 300.0).abs() < f32::EPSILON);
    }
}

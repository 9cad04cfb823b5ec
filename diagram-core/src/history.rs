//! Undo/redo history over diagram snapshots.
//!
//! The manager keeps a bounded stack of deep-copied snapshots. Capture
//! is debounced: rapid consecutive mutations (a continuous drag) within
//! the window coalesce into a single trailing entry, so one gesture
//! yields one undo step. Entry points taking an explicit [`Instant`]
//! keep the debounce logic deterministic under test.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::graph::Graph;
use crate::node::Node;

/// Maximum number of snapshots retained.
pub const HISTORY_LIMIT: usize = 30;

/// Window within which consecutive captures coalesce.
pub const CAPTURE_DEBOUNCE: Duration = Duration::from_millis(750);

/// A deep, independent copy of the full diagram state at one point in
/// time. Owned exclusively by the history manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Nodes in insertion order.
    pub nodes: Vec<Node>,
    /// Edges in insertion order.
    pub edges: Vec<Edge>,
}

impl Snapshot {
    /// Deep-copy the current state of a graph.
    #[must_use]
    pub fn of(graph: &Graph) -> Self {
        let (nodes, edges) = graph.to_parts();
        Self { nodes, edges }
    }

    /// An empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

/// Bounded undo/redo stack with throttled capture.
#[derive(Debug)]
pub struct HistoryManager {
    entries: Vec<Snapshot>,
    /// Meaningful only while `entries` is non-empty.
    cursor: usize,
    pending: Option<Pending>,
    limit: usize,
    restoring: bool,
}

#[derive(Debug)]
struct Pending {
    snapshot: Snapshot,
    last_capture: Instant,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryManager {
    /// Create an empty history with the default bound.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }

    /// Create an empty history with a custom bound (minimum 1).
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            pending: None,
            limit: limit.max(1),
            restoring: false,
        }
    }

    /// Number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the stack holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the current entry, `None` for an empty stack.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.cursor)
        }
    }

    /// Whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.pending.is_some() || (!self.entries.is_empty() && self.cursor > 0)
    }

    /// Whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.pending.is_none() && !self.entries.is_empty() && self.cursor + 1 < self.entries.len()
    }

    /// Offer a candidate snapshot.
    ///
    /// The snapshot replaces any pending one and (re)starts the debounce
    /// window; it commits once the window elapses without another
    /// capture ([`settle`](Self::settle)), or immediately on
    /// [`flush`](Self::flush)/undo/redo. No-op while a restore is in
    /// progress.
    pub fn capture(&mut self, snapshot: Snapshot) {
        self.capture_at(snapshot, Instant::now());
    }

    /// [`capture`](Self::capture) with an explicit timestamp.
    pub fn capture_at(&mut self, snapshot: Snapshot, now: Instant) {
        if self.restoring {
            return;
        }
        self.pending = Some(Pending {
            snapshot,
            last_capture: now,
        });
    }

    /// Commit the pending snapshot if its debounce window has elapsed.
    ///
    /// Returns `true` if an entry was committed.
    pub fn settle(&mut self) -> bool {
        self.settle_at(Instant::now())
    }

    /// [`settle`](Self::settle) with an explicit timestamp.
    pub fn settle_at(&mut self, now: Instant) -> bool {
        let elapsed = match &self.pending {
            Some(pending) => now.saturating_duration_since(pending.last_capture),
            None => return false,
        };
        if elapsed < CAPTURE_DEBOUNCE {
            return false;
        }
        self.flush()
    }

    /// Commit the pending snapshot immediately, ignoring the window.
    ///
    /// Returns `true` if an entry was committed.
    pub fn flush(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => self.commit(pending.snapshot),
            None => false,
        }
    }

    /// Step back one entry. Flushes any pending capture first so the
    /// freshest edit is undoable. Returns the snapshot to apply, or
    /// `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<Snapshot> {
        self.flush();
        if self.entries.is_empty() || self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].clone())
    }

    /// Step forward one entry. Returns the snapshot to apply, or `None`
    /// at the newest entry.
    pub fn redo(&mut self) -> Option<Snapshot> {
        self.flush();
        if self.entries.is_empty() || self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].clone())
    }

    /// Suppress capture while a restored snapshot is applied to the
    /// model, so the restore itself is not recorded as a new edit.
    pub fn begin_restore(&mut self) {
        self.restoring = true;
    }

    /// Re-enable capture after a restore.
    pub fn end_restore(&mut self) {
        self.restoring = false;
    }

    /// Clear the stack entirely. Used when switching documents; follow
    /// with [`seed`](Self::seed) for the freshly loaded state.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.pending = None;
        self.cursor = 0;
        self.restoring = false;
    }

    /// Reset and seed with a single snapshot of freshly loaded state.
    pub fn seed(&mut self, snapshot: Snapshot) {
        self.reset();
        self.entries.push(snapshot);
        self.cursor = 0;
    }

    fn commit(&mut self, snapshot: Snapshot) -> bool {
        if let Some(current) = self.entries.get(self.cursor) {
            if *current == snapshot {
                return false;
            }
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(snapshot);
        if self.entries.len() > self.limit {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len() - 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{BusType, Interface, PortDirection};
    use crate::node::{NodePatch, Position};

    fn graph_with_node(id: &str) -> Graph {
        let mut graph = Graph::new();
        graph
            .add_node(
                Node::new("block", id)
                    .with_id(id)
                    .with_interface(Interface::new("p", BusType::Gpio, PortDirection::Inout)),
            )
            .expect("add");
        graph
    }

    fn snap(graph: &Graph) -> Snapshot {
        Snapshot::of(graph)
    }

    #[test]
    fn test_seed_then_no_undo() {
        let graph = graph_with_node("n1");
        let mut history = HistoryManager::new();
        history.seed(snap(&graph));

        assert_eq!(history.len(), 1);
        assert_eq!(history.current_index(), Some(0));
        assert!(!history.can_undo());
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_rapid_captures_coalesce_to_one_entry() {
        // Scenario: 20 rapid drag mutations within the window produce
        // exactly 1 entry; a second burst after a pause produces a 2nd;
        // two undos return to the pre-drag state.
        let mut graph = graph_with_node("n1");
        let mut history = HistoryManager::new();
        history.seed(snap(&graph));
        let pre_drag = snap(&graph);

        let t0 = Instant::now();
        for i in 0..20_u16 {
            graph
                .update_node(
                    &"n1".into(),
                    NodePatch::move_to(Position::new(f32::from(i), 0.0)),
                )
                .expect("drag");
            history.capture_at(snap(&graph), t0 + Duration::from_millis(u64::from(i) * 30));
        }
        // Not settled inside the window.
        assert!(!history.settle_at(t0 + Duration::from_millis(20 * 30)));
        assert_eq!(history.len(), 1);

        // Pause past the window: the burst commits as one entry.
        assert!(history.settle_at(t0 + Duration::from_secs(2)));
        assert_eq!(history.len(), 2);

        // Second burst.
        let t1 = t0 + Duration::from_secs(3);
        graph
            .update_node(&"n1".into(), NodePatch::move_to(Position::new(500.0, 0.0)))
            .expect("drag");
        history.capture_at(snap(&graph), t1);
        assert!(history.settle_at(t1 + Duration::from_secs(1)));
        assert_eq!(history.len(), 3);

        // Undo twice lands on the pre-drag state.
        let _ = history.undo().expect("undo 1");
        let restored = history.undo().expect("undo 2");
        assert_eq!(restored, pre_drag);
    }

    #[test]
    fn test_identical_snapshot_not_committed() {
        let graph = graph_with_node("n1");
        let mut history = HistoryManager::new();
        history.seed(snap(&graph));

        history.capture_at(snap(&graph), Instant::now());
        assert!(!history.flush());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_new_edit_after_undo_cuts_redo_branch() {
        let mut graph = graph_with_node("n1");
        let mut history = HistoryManager::new();
        history.seed(snap(&graph));

        for x in [10.0_f32, 20.0, 30.0] {
            graph
                .update_node(&"n1".into(), NodePatch::move_to(Position::new(x, 0.0)))
                .expect("move");
            history.capture_at(snap(&graph), Instant::now());
            history.flush();
        }
        assert_eq!(history.len(), 4);

        let _ = history.undo().expect("undo");
        let _ = history.undo().expect("undo");
        assert!(history.can_redo());

        // A fresh edit truncates the redo tail.
        graph
            .update_node(&"n1".into(), NodePatch::move_to(Position::new(99.0, 0.0)))
            .expect("move");
        history.capture_at(snap(&graph), Instant::now());
        history.flush();

        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        assert_eq!(history.current_index(), Some(2));
    }

    #[test]
    fn test_eviction_at_bound() {
        let mut graph = graph_with_node("n1");
        let mut history = HistoryManager::with_limit(5);
        history.seed(snap(&graph));

        for x in 0..10_u16 {
            graph
                .update_node(
                    &"n1".into(),
                    NodePatch::move_to(Position::new(f32::from(x), 0.0)),
                )
                .expect("move");
            history.capture_at(snap(&graph), Instant::now());
            history.flush();
        }

        assert_eq!(history.len(), 5);
        assert_eq!(history.current_index(), Some(4));
        // Oldest entries were evicted; undo to the floor stops there.
        let mut undos = 0;
        while history.undo().is_some() {
            undos += 1;
        }
        assert_eq!(undos, 4);
    }

    #[test]
    fn test_capture_suppressed_during_restore() {
        let graph = graph_with_node("n1");
        let mut history = HistoryManager::new();
        history.seed(snap(&graph));

        history.begin_restore();
        history.capture_at(snap(&graph), Instant::now());
        history.end_restore();

        assert!(!history.flush());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_undo_flushes_pending_first() {
        let mut graph = graph_with_node("n1");
        let mut history = HistoryManager::new();
        history.seed(snap(&graph));
        let before = snap(&graph);

        graph
            .update_node(&"n1".into(), NodePatch::move_to(Position::new(7.0, 7.0)))
            .expect("move");
        history.capture_at(snap(&graph), Instant::now());

        // Undo right away: the pending edit commits, then undo returns
        // the prior state.
        let restored = history.undo().expect("undo");
        assert_eq!(restored, before);
        assert!(history.can_redo());
    }

    #[test]
    fn test_redo_round_trip() {
        let mut graph = graph_with_node("n1");
        let mut history = HistoryManager::new();
        history.seed(snap(&graph));

        graph
            .update_node(&"n1".into(), NodePatch::move_to(Position::new(50.0, 0.0)))
            .expect("move");
        let after = snap(&graph);
        history.capture_at(after.clone(), Instant::now());
        history.flush();

        let _ = history.undo().expect("undo");
        let redone = history.redo().expect("redo");
        assert_eq!(redone, after);
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_reset_clears_everything() {
        let graph = graph_with_node("n1");
        let mut history = HistoryManager::new();
        history.seed(snap(&graph));
        history.capture_at(snap(&graph), Instant::now());

        history.reset();
        assert!(history.is_empty());
        assert_eq!(history.current_index(), None);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}

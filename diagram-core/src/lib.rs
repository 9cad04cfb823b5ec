//! # Diagram Core
//!
//! Core editing engine for hardware block diagrams: the in-memory
//! node/edge model, the port-direction-aware connection validator, the
//! undo/redo history manager, and the editor facade that keeps them
//! consistent.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               diagram-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Graph Model     │  Connection Validator    │
//! │  - Nodes/ports   │  - Direction roles       │
//! │  - Edges         │  - Duplicate keys        │
//! │  - Cascades      │  - Load audit + repair   │
//! ├─────────────────────────────────────────────┤
//! │  History         │  Editor Facade           │
//! │  - Snapshots     │  - Dirty tracking        │
//! │  - Debounce      │  - Subscribe/notify      │
//! │  - Undo/redo     │  - Load state machine    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Persistence lives in the sibling `diagram-store` crate; this crate is
//! synchronous and performs no I/O.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod document;
pub mod edge;
pub mod editor;
pub mod error;
pub mod graph;
pub mod history;
pub mod interface;
pub mod node;
pub mod validate;

pub use document::DiagramDocument;
pub use edge::{Edge, EdgeId, EdgeKind, EndpointKey};
pub use editor::{ConnectOutcome, DiagramEditor, EditorEvent, ListenerId, LoadOutcome};
pub use error::{DiagramError, DiagramResult};
pub use graph::Graph;
pub use history::{HistoryManager, Snapshot, CAPTURE_DEBOUNCE, HISTORY_LIMIT};
pub use interface::{BusType, DataFlowRole, Interface, InterfaceId, Placement, PortDirection, PortRole};
pub use node::{Node, NodeId, NodePatch, Position, Size};
pub use validate::{
    ConnectionCandidate, ConnectionFit, ConnectionPlan, EdgeAudit, InvalidEdge, InvalidEdgeReason,
    LoadReport, PendingLoad, RepairDecision,
};

/// Diagram core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

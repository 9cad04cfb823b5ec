//! # Diagram Store
//!
//! Persistence coordination for the block-diagram editing engine.
//!
//! The editing core (`diagram-core`) is synchronous and performs no
//! I/O; this crate decides when and how its canonical document is
//! written to a remote store. It provides the [`DocumentStore`]
//! collaborator boundary, in-memory and filesystem implementations, and
//! the [`PersistenceCoordinator`] that owns dirty-driven autosave,
//! manual save status, primary/fallback channels, and load
//! coalescing/staleness.

pub mod coordinator;
pub mod store;

pub use coordinator::{
    AutosavePolicy, OpenOutcome, PersistenceCoordinator, SaveOutcome, SaveStatus,
};
pub use store::{DocumentStore, FileStore, MemoryStore, StoreError};

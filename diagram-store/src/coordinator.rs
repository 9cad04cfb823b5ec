//! Persistence coordination: dirty tracking, autosave, manual save
//! status, and the load path with fallback and staleness handling.
//!
//! The coordinator owns the policy side of persistence. The editing
//! core marks itself dirty on every mutation; on each autosave tick (or
//! manual save) the coordinator serializes the canonical document and
//! writes it only when it actually differs from the last successfully
//! saved form. Conflict policy is last-writer-wins: there is no remote
//! change detection, and full-content equality against the locally
//! remembered last-saved form is the only guard against redundant
//! writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use diagram_core::{DiagramDocument, DiagramEditor, DiagramResult, LoadOutcome, RepairDecision};

use crate::store::{DocumentStore, StoreError};

/// Default autosave interval.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(10);

/// How long the `Saved` status is shown before returning to idle.
pub const SAVED_STATUS_RESET: Duration = Duration::from_secs(2);

/// How long the `Error` status is shown before returning to idle.
pub const ERROR_STATUS_RESET: Duration = Duration::from_secs(3);

/// Save-status indicator driven by manual saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    /// Nothing in flight.
    Idle,
    /// A manual save is in progress.
    Saving,
    /// The last manual save succeeded (or was a no-op).
    Saved,
    /// Every save channel failed; unsaved changes are retained.
    Error,
}

/// Timing policy for the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct AutosavePolicy {
    /// Autosave tick interval.
    pub interval: Duration,
    /// `Saved` status hold time.
    pub saved_reset: Duration,
    /// `Error` status hold time.
    pub error_reset: Duration,
}

impl Default for AutosavePolicy {
    fn default() -> Self {
        Self {
            interval: AUTOSAVE_INTERVAL,
            saved_reset: SAVED_STATUS_RESET,
            error_reset: ERROR_STATUS_RESET,
        }
    }
}

/// Outcome of opening a document.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    /// The load completed against the current context.
    Loaded(LoadOutcome),
    /// A load for the same context was already in flight; this request
    /// was ignored.
    Coalesced,
    /// The context changed while this load was in flight; its response
    /// was discarded.
    Superseded,
}

/// Outcome of one save pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing to do: no open document, or the model was not dirty.
    Skipped,
    /// The model was dirty but its canonical form matched the last
    /// save; the dirty flag was cleared without a write.
    NoChange,
    /// The document was written (through the primary or the fallback
    /// channel).
    Written,
    /// Every channel failed; the dirty flag is preserved for retry.
    Failed,
}

/// The active document context. Loads and autosave ticks are tagged
/// with the generation token; anything carrying a stale token is
/// discarded rather than cancelled.
#[derive(Debug, Clone)]
struct ActiveContext {
    document_id: String,
    token: u64,
}

#[derive(Default)]
struct CoordinatorState {
    context: Option<ActiveContext>,
    last_saved_canonical: Option<String>,
    load_in_flight: Option<u64>,
    autosave: Option<JoinHandle<()>>,
}

/// Decides when and how the canonical document is written to the
/// persistence boundary.
///
/// Cheap to clone; clones share the same editor and state (the
/// autosave task holds one).
#[derive(Clone)]
pub struct PersistenceCoordinator {
    editor: Arc<Mutex<DiagramEditor>>,
    primary: Arc<dyn DocumentStore>,
    fallback: Option<Arc<dyn DocumentStore>>,
    policy: AutosavePolicy,
    state: Arc<Mutex<CoordinatorState>>,
    next_token: Arc<AtomicU64>,
    status_epoch: Arc<AtomicU64>,
    status_tx: Arc<watch::Sender<SaveStatus>>,
    status_rx: watch::Receiver<SaveStatus>,
}

impl PersistenceCoordinator {
    /// Create a coordinator over an editor and a primary save channel.
    #[must_use]
    pub fn new(editor: Arc<Mutex<DiagramEditor>>, primary: Arc<dyn DocumentStore>) -> Self {
        let (status_tx, status_rx) = watch::channel(SaveStatus::Idle);
        Self {
            editor,
            primary,
            fallback: None,
            policy: AutosavePolicy::default(),
            state: Arc::new(Mutex::new(CoordinatorState::default())),
            next_token: Arc::new(AtomicU64::new(0)),
            status_epoch: Arc::new(AtomicU64::new(0)),
            status_tx: Arc::new(status_tx),
            status_rx,
        }
    }

    /// Add a secondary save/load channel, tried when the primary fails.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn DocumentStore>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Override the timing policy.
    #[must_use]
    pub fn with_policy(mut self, policy: AutosavePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The shared editor handle.
    #[must_use]
    pub fn editor(&self) -> Arc<Mutex<DiagramEditor>> {
        Arc::clone(&self.editor)
    }

    /// Current save status.
    #[must_use]
    pub fn status(&self) -> SaveStatus {
        *self.status_rx.borrow()
    }

    /// Subscribe to save-status changes.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status_tx.subscribe()
    }

    /// The id of the open document, if any.
    #[must_use]
    pub fn document_id(&self) -> Option<String> {
        lock(&self.state)
            .context
            .as_ref()
            .map(|c| c.document_id.clone())
    }

    /// Open a document, replacing the active context.
    ///
    /// A second request for a context whose load is already in flight
    /// is coalesced (ignored). On a miss or failure of the primary
    /// source, the fallback source is tried; on total failure or a
    /// parse error, the editor receives an empty document rather than
    /// an error. The autosave timer restarts for the new context.
    pub async fn open_document(&self, document_id: &str) -> OpenOutcome {
        self.open_inner(document_id, false).await
    }

    /// Re-load the active document, superseding any in-flight load.
    ///
    /// The older load keeps running but carries a stale token, so its
    /// response is discarded when it arrives.
    pub async fn force_reload(&self, document_id: &str) -> OpenOutcome {
        self.open_inner(document_id, true).await
    }

    async fn open_inner(&self, document_id: &str, force: bool) -> OpenOutcome {
        let token = {
            let mut state = lock(&self.state);
            let same_context = state
                .context
                .as_ref()
                .is_some_and(|c| c.document_id == document_id);
            if !force && same_context && state.load_in_flight.is_some() {
                tracing::debug!("Load for {document_id} already in flight; coalescing");
                return OpenOutcome::Coalesced;
            }
            if let Some(handle) = state.autosave.take() {
                handle.abort();
            }
            let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
            state.context = Some(ActiveContext {
                document_id: document_id.to_string(),
                token,
            });
            state.load_in_flight = Some(token);
            token
        };

        let content = self.fetch(document_id).await;

        let document = match content {
            Some(raw) => match DiagramDocument::from_json(&raw) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!("Failed to parse document {document_id}: {e}; starting empty");
                    DiagramDocument::empty()
                }
            },
            None => DiagramDocument::empty(),
        };
        let stored_canonical = document.to_canonical_json().ok();

        {
            let mut state = lock(&self.state);
            if state.context.as_ref().map(|c| c.token) != Some(token) {
                tracing::debug!("Discarding stale load response for {document_id}");
                return OpenOutcome::Superseded;
            }
            state.load_in_flight = None;
            state.last_saved_canonical = stored_canonical;
        }

        let outcome = {
            let mut editor = lock(&self.editor);
            editor.begin_load(document)
        };
        tracing::info!("Opened document {document_id}");
        self.spawn_autosave(token);
        OpenOutcome::Loaded(outcome)
    }

    /// Resolve a load that surfaced invalid edges.
    ///
    /// Repaired and pruned documents come back dirty, so the cleanup is
    /// persisted by the next autosave tick.
    ///
    /// # Errors
    ///
    /// Propagates [`DiagramError::NoPendingLoad`](diagram_core::DiagramError::NoPendingLoad)
    /// when no load is awaiting a decision.
    pub fn resolve_load(&self, decision: RepairDecision) -> DiagramResult<bool> {
        lock(&self.editor).resolve_load(decision)
    }

    /// Close the active document and suspend autosave entirely.
    pub fn close_document(&self) {
        let mut state = lock(&self.state);
        if let Some(handle) = state.autosave.take() {
            handle.abort();
        }
        state.context = None;
        state.load_in_flight = None;
        state.last_saved_canonical = None;
        tracing::info!("Closed document; autosave suspended");
    }

    /// Manually save the open document, driving the UI status through
    /// `Saving -> (Saved | Error) -> Idle`.
    ///
    /// Uses the same compare-and-write path as autosave: a clean model
    /// or an unchanged canonical form is a successful no-op. On failure
    /// of every channel the dirty flag is preserved so the next tick or
    /// manual save retries.
    pub async fn save_now(&self) -> SaveOutcome {
        let Some(context) = lock(&self.state).context.clone() else {
            tracing::debug!("Manual save with no open document");
            return SaveOutcome::Skipped;
        };

        self.set_status(SaveStatus::Saving);
        let outcome = self.flush_if_dirty(&context.document_id).await;
        let (status, hold) = match outcome {
            SaveOutcome::Failed => (SaveStatus::Error, self.policy.error_reset),
            _ => (SaveStatus::Saved, self.policy.saved_reset),
        };
        let epoch = self.set_status(status);
        self.spawn_status_reset(epoch, hold);
        outcome
    }

    /// Drive one autosave pass. Called by the interval task; exposed so
    /// hosts and tests can run the cycle on their own cadence.
    ///
    /// A tick with a clean model performs no store call at all.
    pub async fn autosave_cycle(&self) -> SaveOutcome {
        let Some(context) = lock(&self.state).context.clone() else {
            return SaveOutcome::Skipped;
        };
        self.flush_if_dirty(&context.document_id).await
    }

    async fn flush_if_dirty(&self, document_id: &str) -> SaveOutcome {
        let canonical = {
            let mut editor = lock(&self.editor);
            // Settle any debounced history capture alongside the save
            // tick; the host event loop has no other timer for it.
            let _ = editor.settle_history();
            if !editor.is_dirty() {
                return SaveOutcome::Skipped;
            }
            match editor.document().to_canonical_json() {
                Ok(canonical) => canonical,
                Err(e) => {
                    tracing::warn!("Failed to serialize document {document_id}: {e}");
                    return SaveOutcome::Failed;
                }
            }
        };

        let unchanged = lock(&self.state).last_saved_canonical.as_deref() == Some(canonical.as_str());
        if unchanged {
            lock(&self.editor).mark_saved();
            return SaveOutcome::NoChange;
        }

        match self.write_through(document_id, &canonical).await {
            Ok(()) => {
                lock(&self.state).last_saved_canonical = Some(canonical);
                lock(&self.editor).mark_saved();
                SaveOutcome::Written
            }
            Err(e) => {
                tracing::warn!("{e}; retaining unsaved changes for retry");
                SaveOutcome::Failed
            }
        }
    }

    async fn write_through(&self, document_id: &str, content: &str) -> Result<(), StoreError> {
        match self.primary.save(document_id, content).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("Primary save failed for {document_id}: {e}");
                let Some(fallback) = &self.fallback else {
                    return Err(StoreError::SaveFailed(document_id.to_string()));
                };
                match fallback.save(document_id, content).await {
                    Ok(()) => {
                        tracing::info!("Saved {document_id} through fallback channel");
                        Ok(())
                    }
                    Err(e) => {
                        tracing::warn!("Fallback save failed for {document_id}: {e}");
                        Err(StoreError::SaveFailed(document_id.to_string()))
                    }
                }
            }
        }
    }

    async fn fetch(&self, document_id: &str) -> Option<String> {
        match self.primary.load(document_id).await {
            Ok(Some(content)) => return Some(content),
            Ok(None) => tracing::debug!("Document {document_id} not found in primary source"),
            Err(e) => tracing::warn!("Primary load failed for {document_id}: {e}"),
        }
        let fallback = self.fallback.as_ref()?;
        match fallback.load(document_id).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Fallback load failed for {document_id}: {e}");
                None
            }
        }
    }

    fn spawn_autosave(&self, token: u64) {
        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(coordinator.policy.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; skip it so the
            // cadence starts one interval after open.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !coordinator.is_current(token) {
                    break;
                }
                let _ = coordinator.autosave_cycle().await;
            }
        });
        lock(&self.state).autosave = Some(handle);
    }

    fn is_current(&self, token: u64) -> bool {
        lock(&self.state).context.as_ref().map(|c| c.token) == Some(token)
    }

    fn set_status(&self, status: SaveStatus) -> u64 {
        let epoch = self.status_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.status_tx.send(status);
        epoch
    }

    fn spawn_status_reset(&self, epoch: u64, hold: Duration) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            // Only reset if nothing newer has driven the status since.
            if coordinator.status_epoch.load(Ordering::SeqCst) == epoch {
                let _ = coordinator.status_tx.send(SaveStatus::Idle);
            }
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

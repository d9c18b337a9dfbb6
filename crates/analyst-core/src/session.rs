//! Sessions and the session cache
//!
//! A session pins one dataset lineage, its artifact store, and a bounded
//! turn history. Sessions live in a capacity- and idle-bounded cache;
//! expiry drops the whole session state, artifacts included.

use crate::config::EngineConfig;
use crate::error::EngineError;
use analyst_exec::{ArtifactStore, RunStatus};
use analyst_frame::Frame;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, TryLockError};
use ulid::Ulid;
use uuid::Uuid;

/// One answered turn, kept for context
#[derive(Debug, Clone)]
pub struct TurnRecord {
    /// The analyst's request text
    pub request: String,
    /// Run that answered it
    pub run_id: Ulid,
    /// How that run ended
    pub status: RunStatus,
    /// When the turn completed
    pub at: DateTime<Utc>,
}

/// One analyst's working state
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    dataset: RwLock<Option<Arc<Frame>>>,
    store: ArtifactStore,
    history: Mutex<VecDeque<TurnRecord>>,
    history_limit: usize,
    last_report: Mutex<Option<String>>,
    // held for the duration of one run; try_lock failure means a run is live
    run_guard: AsyncMutex<()>,
}

impl Session {
    fn new(id: Uuid, history_limit: usize) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            dataset: RwLock::new(None),
            store: ArtifactStore::new(),
            history: Mutex::new(VecDeque::new()),
            history_limit,
            last_report: Mutex::new(None),
            run_guard: AsyncMutex::new(()),
        }
    }

    /// Session identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the session was created
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current dataset version, if one is loaded
    #[must_use]
    pub fn dataset(&self) -> Option<Arc<Frame>> {
        self.dataset.read().clone()
    }

    /// Replace the dataset and drop every artifact of the old lineage
    ///
    /// Artifacts reference frame versions of the outgoing dataset; keeping
    /// them would let reports mix lineages.
    pub fn replace_dataset(&self, frame: Arc<Frame>) {
        let mut slot = self.dataset.write();
        self.store.clear();
        *slot = Some(frame);
    }

    /// Artifact store of the current lineage
    #[inline]
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Record a completed turn, evicting the oldest past the bound
    pub fn push_turn(&self, record: TurnRecord) {
        let mut history = self.history.lock();
        if history.len() == self.history_limit {
            history.pop_front();
        }
        history.push_back(record);
    }

    /// Turn history, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<TurnRecord> {
        self.history.lock().iter().cloned().collect()
    }

    /// Keep the most recent compiled report for later retrieval
    pub fn set_report(&self, report: String) {
        *self.last_report.lock() = Some(report);
    }

    /// Most recent compiled report, if any turn has completed
    #[must_use]
    pub fn last_report(&self) -> Option<String> {
        self.last_report.lock().clone()
    }

    /// Claim the session for one run
    ///
    /// # Errors
    /// [`EngineError::RunInProgress`] when another run holds the claim.
    pub fn try_begin_run(&self) -> Result<tokio::sync::MutexGuard<'_, ()>, EngineError> {
        self.run_guard
            .try_lock()
            .map_err(|_: TryLockError| EngineError::RunInProgress(self.id))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("artifacts", &self.store.len())
            .finish_non_exhaustive()
    }
}

/// Idle- and capacity-bounded session cache
pub struct SessionManager {
    sessions: Cache<Uuid, Arc<Session>>,
    history_limit: usize,
}

impl SessionManager {
    /// Build a manager from the engine's limits
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let sessions = Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_idle(config.session_ttl)
            .build();
        Self {
            sessions,
            history_limit: config.history_limit,
        }
    }

    /// Create a fresh session
    pub async fn create(&self) -> Arc<Session> {
        let id = Uuid::new_v4();
        let session = Arc::new(Session::new(id, self.history_limit));
        self.sessions.insert(id, Arc::clone(&session)).await;
        tracing::info!(session = %id, "session created");
        session
    }

    /// Existing session by id
    ///
    /// # Errors
    /// [`EngineError::SessionNotFound`] when the id was never issued or the
    /// session has expired.
    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>, EngineError> {
        self.sessions
            .get(&id)
            .await
            .ok_or(EngineError::SessionNotFound(id))
    }

    /// Drop a session and all its state
    pub async fn evict(&self, id: Uuid) {
        self.sessions.invalidate(&id).await;
        tracing::info!(session = %id, "session evicted");
    }

    /// Live session count (approximate under concurrency)
    #[must_use]
    pub fn len(&self) -> u64 {
        self.sessions.entry_count()
    }

    /// Whether no sessions are live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

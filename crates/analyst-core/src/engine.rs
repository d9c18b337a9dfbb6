//! The analysis engine
//!
//! Ties the pipeline together: session lookup, plan generation against the
//! live dataset schema, deterministic execution into the session's artifact
//! store, and report compilation. One request in, one markdown report out.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::generate::PlanGenerator;
use crate::llm::LanguageModel;
use crate::report;
use crate::session::{Session, SessionManager, TurnRecord};
use analyst_exec::{Artifact, PlanRunner, RunSummary};
use analyst_frame::{ingest_path, IngestReport, SchemaSummary};
use analyst_plan::StepId;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Result of one conversational turn
#[derive(Debug)]
pub struct TurnOutput {
    /// Execution summary of the run that answered the turn
    pub run: RunSummary,
    /// Compiled markdown report
    pub report: String,
    /// Model calls spent generating the plan
    pub plan_attempts: u32,
}

/// Orchestrates sessions, plan generation, and execution
pub struct AnalysisEngine {
    sessions: SessionManager,
    generator: PlanGenerator,
    config: EngineConfig,
}

impl AnalysisEngine {
    /// Build an engine over the given model backend
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, config: EngineConfig) -> Self {
        Self {
            sessions: SessionManager::new(&config),
            generator: PlanGenerator::new(model, config.max_plan_retries),
            config,
        }
    }

    /// Open a fresh session and return its id
    pub async fn create_session(&self) -> Uuid {
        self.sessions.create().await.id()
    }

    /// Load a dataset file into a session, replacing any current dataset
    ///
    /// Artifacts of the previous dataset are dropped with it. Returns the
    /// new schema summary and the ingestion report (malformed rows
    /// included).
    ///
    /// # Errors
    /// Unknown session, unreadable or malformed file, or a dataset larger
    /// than the configured row cap.
    pub async fn load_dataset(
        &self,
        session_id: Uuid,
        path: &Path,
    ) -> Result<(SchemaSummary, IngestReport), EngineError> {
        let session = self.sessions.get(session_id).await?;
        let (frame, ingest) = ingest_path(path)?;
        if frame.row_count() > self.config.max_rows {
            return Err(EngineError::ResourceExhausted(format!(
                "dataset has {} rows, the limit is {}",
                frame.row_count(),
                self.config.max_rows
            )));
        }
        let frame = Arc::new(frame);
        let summary = frame.summary();
        session.replace_dataset(frame);
        tracing::info!(
            session = %session_id,
            dataset = %summary.dataset,
            rows = summary.row_count,
            malformed = ingest.malformed.len(),
            "dataset loaded"
        );
        Ok((summary, ingest))
    }

    /// Answer one natural-language request with a full analysis run
    pub async fn handle_turn(
        &self,
        session_id: Uuid,
        request: &str,
    ) -> Result<TurnOutput, EngineError> {
        self.handle_turn_with_cancel(session_id, request, &CancellationToken::new())
            .await
    }

    /// [`handle_turn`](Self::handle_turn) with an external cancellation
    /// handle; cancellation is observed between steps
    pub async fn handle_turn_with_cancel(
        &self,
        session_id: Uuid,
        request: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutput, EngineError> {
        let session = self.sessions.get(session_id).await?;
        let dataset = session
            .dataset()
            .ok_or(EngineError::DatasetNotFound(session_id))?;
        // claim the session before spending model calls
        let _run = session.try_begin_run()?;

        let history: Vec<String> = session
            .history()
            .into_iter()
            .map(|turn| turn.request)
            .collect();
        let generated = self
            .generator
            .generate(request, &history, &dataset.summary())
            .await?;
        let plan = Arc::new(generated.plan);

        // the runner is CPU-bound; keep it off the async workers
        let summary = {
            let plan = Arc::clone(&plan);
            let dataset = Arc::clone(&dataset);
            let session = Arc::clone(&session);
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                PlanRunner::run(&plan, &dataset, session.store(), &cancel)
            })
            .await
            .map_err(|e| EngineError::Execution(e.to_string()))?
        };
        let report = report::render(
            request,
            &dataset,
            &plan,
            session.store(),
            &summary,
            self.config.report_row_cap,
        );
        session.set_report(report.clone());

        session.push_turn(TurnRecord {
            request: request.to_string(),
            run_id: summary.run_id,
            status: summary.status,
            at: Utc::now(),
        });

        Ok(TurnOutput {
            run: summary,
            report,
            plan_attempts: generated.attempts,
        })
    }

    /// One artifact from a session's store
    pub async fn artifact(
        &self,
        session_id: Uuid,
        step_id: &StepId,
    ) -> Result<Option<Artifact>, EngineError> {
        let session = self.sessions.get(session_id).await?;
        Ok(session.store().get(step_id))
    }

    /// Every artifact of the session's current lineage, execution order
    pub async fn artifacts(&self, session_id: Uuid) -> Result<Vec<Artifact>, EngineError> {
        let session = self.sessions.get(session_id).await?;
        Ok(session.store().list())
    }

    /// Most recent compiled report of a session, if any turn has completed
    pub async fn report(&self, session_id: Uuid) -> Result<Option<String>, EngineError> {
        let session = self.sessions.get(session_id).await?;
        Ok(session.last_report())
    }

    /// Session handle, for history inspection
    pub async fn session(&self, session_id: Uuid) -> Result<Arc<Session>, EngineError> {
        self.sessions.get(session_id).await
    }

    /// Drop a session and everything it holds
    pub async fn reset(&self, session_id: Uuid) {
        self.sessions.evict(session_id).await;
    }
}

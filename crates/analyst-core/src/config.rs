//! Engine configuration

use std::time::Duration;

/// Tunable limits and defaults for an [`AnalysisEngine`](crate::AnalysisEngine)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Corrective retries after a rejected plan (model calls = retries + 1)
    pub max_plan_retries: u32,
    /// Idle time after which a session expires
    pub session_ttl: Duration,
    /// Maximum live sessions before the cache evicts
    pub max_sessions: u64,
    /// Conversation turns retained per session
    pub history_limit: usize,
    /// Largest dataset (rows) a session will accept
    pub max_rows: usize,
    /// Rows shown per table in a compiled report
    pub report_row_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_plan_retries: 2,
            session_ttl: Duration::from_secs(30 * 60),
            max_sessions: 256,
            history_limit: 50,
            max_rows: 1_000_000,
            report_row_cap: 20,
        }
    }
}

impl EngineConfig {
    /// Override the plan retry budget
    #[must_use]
    pub fn with_max_plan_retries(mut self, retries: u32) -> Self {
        self.max_plan_retries = retries;
        self
    }

    /// Override the session idle TTL
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Override the live session cap
    #[must_use]
    pub fn with_max_sessions(mut self, max: u64) -> Self {
        self.max_sessions = max;
        self
    }

    /// Override the per-session history bound
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Override the dataset row cap
    #[must_use]
    pub fn with_max_rows(mut self, rows: usize) -> Self {
        self.max_rows = rows;
        self
    }
}

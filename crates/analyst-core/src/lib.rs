//! analyst-core, the orchestration layer
//!
//! Turns a natural-language analysis request into a validated plan (via a
//! language model and the `analyst-plan` validator), executes it with
//! `analyst-exec`, and compiles the artifact trail into a markdown report.
//! Sessions pin a dataset lineage and its artifacts between turns.

pub mod config;
pub mod engine;
pub mod error;
pub mod generate;
pub mod llm;
mod report;
pub mod session;

pub use config::EngineConfig;
pub use engine::{AnalysisEngine, TurnOutput};
pub use error::EngineError;
pub use generate::{GeneratedPlan, PlanGenerator};
pub use llm::{HttpModel, LanguageModel, ModelError, ModelRequest};
pub use session::{Session, SessionManager, TurnRecord};

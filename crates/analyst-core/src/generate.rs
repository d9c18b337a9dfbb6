//! Plan generation with corrective retries
//!
//! One completion call produces candidate text; the validator either accepts
//! it as a [`Plan`] or rejects it with a precise reason. On rejection the
//! reason is fed back to the model verbatim and the call is retried, up to a
//! bounded budget. The loop never returns a partially valid plan.

use crate::error::EngineError;
use crate::llm::{LanguageModel, ModelRequest};
use analyst_frame::SchemaSummary;
use analyst_plan::{parse_and_validate, wire_schema, Plan, PlanError};
use std::sync::Arc;

/// An accepted plan plus how much work it took
#[derive(Debug)]
pub struct GeneratedPlan {
    /// The validated plan
    pub plan: Plan,
    /// Model calls spent, including the successful one
    pub attempts: u32,
    /// Raw model text of the accepted attempt
    pub raw: String,
}

/// Drives the generate/validate/retry loop
pub struct PlanGenerator {
    model: Arc<dyn LanguageModel>,
    max_retries: u32,
}

impl PlanGenerator {
    /// A generator spending at most `1 + max_retries` model calls per request
    pub fn new(model: Arc<dyn LanguageModel>, max_retries: u32) -> Self {
        Self { model, max_retries }
    }

    /// Turn a natural-language request into a validated plan
    ///
    /// # Errors
    /// [`EngineError::PlanGenerationFailed`] when the retry budget is
    /// exhausted on rejected plans; [`EngineError::Model`] on a
    /// non-retryable model failure, or a retryable one that outlives the
    /// budget. Retryable failures (timeouts, throttling) burn attempts
    /// from the same budget.
    pub async fn generate(
        &self,
        request: &str,
        history: &[String],
        summary: &SchemaSummary,
    ) -> Result<GeneratedPlan, EngineError> {
        let system = system_prompt(summary);
        let schema = summary_schema(summary);
        let mut feedback: Vec<PlanError> = Vec::new();

        for attempt in 1..=self.max_retries + 1 {
            let user = user_prompt(request, history, &feedback);
            let raw = match self
                .model
                .complete(&ModelRequest {
                    system: system.clone(),
                    user,
                })
                .await
            {
                Ok(raw) => raw,
                // timeouts and throttling burn an attempt, not the request
                Err(err) if err.retryable() && attempt <= self.max_retries => {
                    tracing::warn!(attempt, error = %err, "model call failed, retrying");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            match parse_and_validate(&raw, &schema) {
                Ok(plan) => {
                    tracing::debug!(attempt, steps = plan.len(), "plan accepted");
                    return Ok(GeneratedPlan {
                        plan,
                        attempts: attempt,
                        raw,
                    });
                }
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "plan rejected");
                    feedback.push(err);
                }
            }
        }

        // the final attempt either returned early or pushed a rejection
        let last_error = feedback.pop().unwrap_or(PlanError::MalformedStructure(
            "no attempts were made".into(),
        ));
        Err(EngineError::PlanGenerationFailed {
            attempts: self.max_retries + 1,
            last_error,
        })
    }
}

fn summary_schema(summary: &SchemaSummary) -> analyst_frame::Schema {
    analyst_frame::Schema::new(
        summary
            .columns
            .iter()
            .map(|c| analyst_frame::ColumnDef::new(c.name.clone(), c.ty))
            .collect(),
    )
}

fn system_prompt(summary: &SchemaSummary) -> String {
    format!(
        "You are a data analysis planner. Answer with exactly one fenced \
         JSON block containing a plan object and nothing else.\n\n\
         The dataset is referenced as \"dataset\". Steps reference each \
         other by id. A plan must be an acyclic graph.\n\n\
         Plan wire format and per-operation parameter schemas:\n{}\n\n\
         Dataset summary:\n{}",
        wire_schema(),
        summary.to_prompt_json()
    )
}

fn user_prompt(request: &str, history: &[String], feedback: &[PlanError]) -> String {
    let mut out = String::new();
    if !history.is_empty() {
        out.push_str("Earlier requests in this session:\n");
        for turn in history {
            out.push_str(&format!("- {turn}\n"));
        }
        out.push('\n');
    }
    out.push_str(request);
    if !feedback.is_empty() {
        out.push_str("\n\nYour previous plans were rejected:\n");
        for (i, err) in feedback.iter().enumerate() {
            out.push_str(&format!("{}. {err}\n", i + 1));
        }
        out.push_str("Produce a corrected plan.");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelError;
    use analyst_frame::{ColumnSummary, ColumnType};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<VecDeque<Result<&'static str, ModelError>>>,
    }

    impl Scripted {
        fn new(replies: Vec<&'static str>) -> Self {
            Self::scripted(replies.into_iter().map(Ok).collect())
        }

        fn scripted(replies: Vec<Result<&'static str, ModelError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for Scripted {
        async fn complete(&self, _request: &ModelRequest) -> Result<String, ModelError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ModelError::EmptyCompletion))
                .map(String::from)
        }
    }

    fn timeout() -> ModelError {
        ModelError::Transport {
            message: "request timed out".into(),
            retryable: true,
        }
    }

    fn summary() -> SchemaSummary {
        SchemaSummary {
            dataset: "sales".into(),
            row_count: 3,
            columns: vec![ColumnSummary {
                name: "revenue".into(),
                ty: ColumnType::Float,
                missing: 0,
                sample: vec![],
            }],
        }
    }

    const GOOD: &str = r#"```json
    {"steps": [{"id": "f", "operation": "filter", "inputs": ["dataset"],
                "params": {"column": "revenue", "op": ">", "value": 0}}]}
    ```"#;

    #[tokio::test]
    async fn accepts_on_first_valid_attempt() {
        let gen = PlanGenerator::new(Arc::new(Scripted::new(vec![GOOD])), 2);
        let out = gen.generate("positive revenue", &[], &summary()).await.unwrap();
        assert_eq!(out.attempts, 1);
        assert_eq!(out.plan.len(), 1);
    }

    #[tokio::test]
    async fn retries_with_feedback_then_accepts() {
        let bad = r#"{"steps": [{"id": "f", "operation": "explode", "inputs": ["dataset"]}]}"#;
        let gen = PlanGenerator::new(Arc::new(Scripted::new(vec![bad, GOOD])), 2);
        let out = gen.generate("positive revenue", &[], &summary()).await.unwrap();
        assert_eq!(out.attempts, 2);
    }

    #[tokio::test]
    async fn timed_out_call_is_retried_within_budget() {
        let gen = PlanGenerator::new(
            Arc::new(Scripted::scripted(vec![Err(timeout()), Ok(GOOD)])),
            2,
        );
        let out = gen.generate("positive revenue", &[], &summary()).await.unwrap();
        assert_eq!(out.attempts, 2);
        assert_eq!(out.plan.len(), 1);
    }

    #[tokio::test]
    async fn retryable_failures_exhaust_the_budget() {
        let gen = PlanGenerator::new(
            Arc::new(Scripted::scripted(vec![Err(timeout()), Err(timeout())])),
            1,
        );
        let err = gen.generate("anything", &[], &summary()).await.unwrap_err();
        assert!(matches!(err, EngineError::Model(_)));
    }

    #[tokio::test]
    async fn non_retryable_failure_aborts_immediately() {
        let auth = ModelError::Endpoint {
            status: 401,
            message: "bad key".into(),
            retryable: false,
        };
        let gen = PlanGenerator::new(
            Arc::new(Scripted::scripted(vec![Err(auth), Ok(GOOD)])),
            2,
        );
        let err = gen.generate("anything", &[], &summary()).await.unwrap_err();
        assert!(matches!(err, EngineError::Model(ModelError::Endpoint { .. })));
    }

    #[test]
    fn prompt_carries_session_history() {
        let history = vec!["filter by region".to_string()];
        let prompt = user_prompt("now chart it", &history, &[]);
        assert!(prompt.contains("filter by region"));
        assert!(prompt.ends_with("now chart it"));
    }

    #[tokio::test]
    async fn exhausts_budget_and_reports_last_error() {
        let bad = r#"{"steps": []}"#;
        let gen = PlanGenerator::new(Arc::new(Scripted::new(vec![bad, bad])), 1);
        let err = gen.generate("anything", &[], &summary()).await.unwrap_err();
        match err {
            EngineError::PlanGenerationFailed {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 2);
                assert!(matches!(last_error, PlanError::MalformedStructure(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

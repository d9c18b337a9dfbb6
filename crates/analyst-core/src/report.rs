//! Markdown report compilation
//!
//! Renders one run into a self-contained markdown document: a header with
//! the request and dataset, an execution log as an overview, and a detailed
//! section for every step that reached an outcome, in execution order.
//! Failures and skips are reported explicitly rather than silently omitted.

use analyst_exec::{ArtifactPayload, ArtifactStore, ChartSpec, RunSummary, StatsTable, StepStatus};
use analyst_frame::Frame;
use analyst_plan::Plan;
use std::fmt::Write as _;

pub(crate) fn render(
    request: &str,
    dataset: &Frame,
    plan: &Plan,
    store: &ArtifactStore,
    summary: &RunSummary,
    row_cap: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Analysis report\n");
    let _ = writeln!(out, "> {request}\n");
    let _ = writeln!(
        out,
        "Dataset `{}` (version {}, {} rows). Run `{}`: {} of {} steps succeeded.\n",
        dataset.name(),
        dataset.version(),
        dataset.row_count(),
        summary.run_id,
        summary.succeeded(),
        summary.steps.len(),
    );

    render_log(&mut out, summary);

    for step in plan.execution_order() {
        let Some(artifact) = store.get(&step.id) else {
            continue;
        };
        let _ = writeln!(out, "## {} ({})\n", step.id, step.op.kind());
        match &artifact.status {
            StepStatus::Succeeded => {
                if let Some(payload) = &artifact.payload {
                    render_payload(&mut out, payload, row_cap);
                }
            }
            StepStatus::Failed { error } => {
                let _ = writeln!(out, "**Step failed:** {error}\n");
            }
            StepStatus::Skipped { cause } => {
                let _ = writeln!(out, "**Step skipped:** {cause}\n");
            }
        }
    }

    out
}

fn render_log(out: &mut String, summary: &RunSummary) {
    let _ = writeln!(out, "| step | operation | outcome |");
    let _ = writeln!(out, "| --- | --- | --- |");
    for step in &summary.steps {
        let outcome = match &step.status {
            StepStatus::Succeeded => "succeeded".to_string(),
            StepStatus::Failed { error } => format!("failed: {error}"),
            StepStatus::Skipped { cause } => format!("skipped: {cause}"),
        };
        let _ = writeln!(out, "| {} | {} | {outcome} |", step.step_id, step.operation);
    }
    out.push('\n');
}

fn render_payload(out: &mut String, payload: &ArtifactPayload, row_cap: usize) {
    match payload {
        ArtifactPayload::Table(frame) => render_table(out, frame, row_cap),
        ArtifactPayload::Stats(table) => render_stats(out, table),
        ArtifactPayload::Chart(spec) => render_chart(out, spec),
        ArtifactPayload::Text(text) => {
            let _ = writeln!(out, "{text}\n");
        }
    }
}

fn render_table(out: &mut String, frame: &Frame, row_cap: usize) {
    let shown = frame.row_count().min(row_cap);
    let names: Vec<&str> = frame.column_names().collect();

    // pad each column to its widest cell so the grid lines up in plain text
    let mut widths: Vec<usize> = names.iter().map(|n| n.len()).collect();
    for (i, (_, col)) in frame.columns().enumerate() {
        for row in 0..shown {
            widths[i] = widths[i].max(col.value(row).to_string().len());
        }
    }

    let header: Vec<String> = names
        .iter()
        .zip(&widths)
        .map(|(n, &w)| format!("{n:<w$}"))
        .collect();
    let _ = writeln!(out, "| {} |", header.join(" | "));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "| {} |", rule.join(" | "));

    for row in 0..shown {
        let cells: Vec<String> = frame
            .columns()
            .zip(&widths)
            .map(|((_, col), &w)| format!("{:<w$}", col.value(row).to_string()))
            .collect();
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
    if frame.row_count() > shown {
        let _ = writeln!(out, "\n_{} more rows not shown._", frame.row_count() - shown);
    }
    out.push('\n');
}

fn render_stats(out: &mut String, table: &StatsTable) {
    let _ = writeln!(out, "**{}**\n", table.title);
    for (name, value) in &table.metrics {
        let _ = writeln!(out, "- {name}: {value}");
    }
    out.push('\n');
}

fn render_chart(out: &mut String, spec: &ChartSpec) {
    let title = spec.title.as_deref().unwrap_or("untitled chart");
    let axes = match &spec.y {
        Some(y) => format!("`{y}` by `{}`", spec.x),
        None => format!("`{}`", spec.x),
    };
    let _ = writeln!(
        out,
        "Chart: {title} ({:?} mark, {axes}, data from `{}`, {} rows).\n",
        spec.mark, spec.data, spec.data_rows
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_exec::{ArtifactStore, PlanRunner};
    use analyst_frame::{ColumnType, Value};
    use analyst_plan::parse_and_validate;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn run_and_render(plan_json: &str, frame: Arc<Frame>, row_cap: usize) -> String {
        let plan = parse_and_validate(plan_json, &frame.schema()).unwrap();
        let store = ArtifactStore::new();
        let summary = PlanRunner::run(&plan, &frame, &store, &CancellationToken::new());
        render("demo request", &frame, &plan, &store, &summary, row_cap)
    }

    fn frame() -> Arc<Frame> {
        Arc::new(
            Frame::from_columns(
                "sales",
                vec![(
                    "revenue".into(),
                    ColumnType::Float,
                    vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
                )],
            )
            .unwrap(),
        )
    }

    #[test]
    fn report_caps_table_rows() {
        let plan = r#"{"steps": [
            {"id": "all", "operation": "filter", "inputs": ["dataset"],
             "params": {"column": "revenue", "op": ">", "value": 0}}
        ]}"#;
        let report = run_and_render(plan, frame(), 2);
        assert!(report.contains("## all (filter)"));
        assert!(report.contains("1 more rows not shown"));
    }

    #[test]
    fn every_completed_step_gets_a_section() {
        let plan = r#"{"steps": [
            {"id": "pos", "operation": "filter", "inputs": ["dataset"],
             "params": {"column": "revenue", "op": ">", "value": 0}},
            {"id": "total", "operation": "aggregate", "inputs": ["pos"],
             "params": {"column": "revenue", "func": "sum"}}
        ]}"#;
        let report = run_and_render(plan, frame(), 20);
        // intermediate steps get a section too, not just the sinks
        assert!(report.contains("## pos (filter)"));
        assert!(report.contains("## total (aggregate)"));
        assert_eq!(report.matches("\n## ").count(), 2);
        assert!(report.contains("| pos | filter | succeeded |"));
    }

    #[test]
    fn failed_step_is_reported_not_hidden() {
        let constant = Arc::new(
            Frame::from_columns(
                "flat",
                vec![
                    (
                        "a".into(),
                        ColumnType::Float,
                        vec![Value::Float(1.0), Value::Float(1.0)],
                    ),
                    (
                        "b".into(),
                        ColumnType::Float,
                        vec![Value::Float(1.0), Value::Float(2.0)],
                    ),
                ],
            )
            .unwrap(),
        );
        let plan = r#"{"steps": [
            {"id": "corr", "operation": "stat_test", "inputs": ["dataset"],
             "params": {"test": "correlation", "column_a": "a", "column_b": "b"}}
        ]}"#;
        let report = run_and_render(plan, constant, 20);
        assert!(report.contains("**Step failed:**"));
    }
}

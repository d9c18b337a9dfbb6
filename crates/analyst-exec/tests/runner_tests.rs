//! End-to-end runner tests: parse a plan, execute it, inspect the trail.

use analyst_exec::{ArtifactPayload, ArtifactStore, PlanRunner, RunStatus, SkipCause, StepStatus};
use analyst_frame::{ColumnType, Frame, Value};
use analyst_plan::parse_and_validate;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn sales_frame() -> Arc<Frame> {
    Arc::new(
        Frame::from_columns(
            "sales",
            vec![
                (
                    "region".into(),
                    ColumnType::Text,
                    vec![
                        Value::from("north"),
                        Value::from("north"),
                        Value::from("south"),
                        Value::from("south"),
                        Value::from("south"),
                    ],
                ),
                (
                    "revenue".into(),
                    ColumnType::Float,
                    vec![
                        Value::Float(100.0),
                        Value::Float(-20.0),
                        Value::Float(50.0),
                        Value::Missing,
                        Value::Float(70.0),
                    ],
                ),
            ],
        )
        .unwrap(),
    )
}

fn run_plan(plan_json: &str, frame: &Arc<Frame>, store: &ArtifactStore) -> analyst_exec::RunSummary {
    let plan = parse_and_validate(plan_json, &frame.schema()).expect("plan should validate");
    PlanRunner::run(&plan, frame, store, &CancellationToken::new())
}

#[test]
fn positive_revenue_pipeline() {
    let frame = sales_frame();
    let store = ArtifactStore::new();
    let plan = r#"{
        "steps": [
            {"id": "pos", "operation": "filter", "inputs": ["dataset"],
             "params": {"column": "revenue", "op": ">", "value": 0}},
            {"id": "by_region", "operation": "aggregate", "inputs": ["pos"],
             "params": {"column": "revenue", "func": "mean", "group_by": "region"}},
            {"id": "chart", "operation": "visualize", "inputs": ["by_region"],
             "params": {"mark": "bar", "x": "region", "y": "mean_revenue"}},
            {"id": "story", "operation": "narrate", "inputs": ["by_region", "chart"]}
        ]
    }"#;

    let summary = run_plan(plan, &frame, &store);
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.succeeded(), 4);

    // negative and missing revenue rows are gone
    let pos = store.get(&"pos".into()).unwrap();
    let table = pos.payload.as_ref().unwrap().as_table().unwrap();
    assert_eq!(table.row_count(), 3);

    // group order follows first appearance; missing was excluded, not zeroed
    let agg = store.get(&"by_region".into()).unwrap();
    let table = agg.payload.as_ref().unwrap().as_table().unwrap();
    let region = table.column("region").unwrap();
    assert_eq!(region.value(0), &Value::from("north"));
    assert_eq!(region.value(1), &Value::from("south"));
    let mean = table.column("mean_revenue").unwrap();
    assert_eq!(mean.value(0), &Value::Float(100.0));
    assert_eq!(mean.value(1), &Value::Float(60.0));

    // narrative mentions both inputs
    let story = store.get(&"story".into()).unwrap();
    let ArtifactPayload::Text(text) = story.payload.as_ref().unwrap() else {
        panic!("expected text payload");
    };
    assert!(text.contains("`by_region`"));
    assert!(text.contains("`chart`"));
}

#[test]
fn failure_cascades_to_dependents_only() {
    let frame = Arc::new(
        Frame::from_columns(
            "t",
            vec![
                (
                    "constant".into(),
                    ColumnType::Float,
                    vec![Value::Float(1.0), Value::Float(1.0), Value::Float(1.0)],
                ),
                (
                    "varying".into(),
                    ColumnType::Float,
                    vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
                ),
            ],
        )
        .unwrap(),
    );
    let store = ArtifactStore::new();
    // correlation against a constant column validates but degenerates at
    // runtime; the independent aggregate branch must still finish
    let plan = r#"{
        "steps": [
            {"id": "corr", "operation": "stat_test", "inputs": ["dataset"],
             "params": {"test": "correlation", "column_a": "constant", "column_b": "varying"}},
            {"id": "story", "operation": "narrate", "inputs": ["corr"]},
            {"id": "total", "operation": "aggregate", "inputs": ["dataset"],
             "params": {"column": "varying", "func": "sum"}}
        ]
    }"#;

    let summary = run_plan(plan, &frame, &store);
    assert_eq!(summary.status, RunStatus::Completed);

    let corr = store.get(&"corr".into()).unwrap();
    assert!(matches!(corr.status, StepStatus::Failed { .. }));

    let story = store.get(&"story".into()).unwrap();
    assert_eq!(
        story.status,
        StepStatus::Skipped {
            cause: SkipCause::UpstreamFailed("corr".into())
        }
    );

    let total = store.get(&"total".into()).unwrap();
    assert!(total.status.is_success());
    assert_eq!(summary.succeeded(), 1);
}

#[test]
fn cancelled_before_start_skips_everything() {
    let frame = sales_frame();
    let store = ArtifactStore::new();
    let plan_json = r#"{
        "steps": [
            {"id": "pos", "operation": "filter", "inputs": ["dataset"],
             "params": {"column": "revenue", "op": ">", "value": 0}},
            {"id": "story", "operation": "narrate", "inputs": ["pos"]}
        ]
    }"#;
    let plan = parse_and_validate(plan_json, &frame.schema()).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = PlanRunner::run(&plan, &frame, &store, &cancel);

    assert_eq!(summary.status, RunStatus::Cancelled);
    assert_eq!(summary.succeeded(), 0);
    for outcome in &summary.steps {
        assert_eq!(
            outcome.status,
            StepStatus::Skipped {
                cause: SkipCause::Cancelled
            }
        );
    }
    // every step still left an artifact behind
    assert_eq!(store.len(), 2);
}

#[test]
fn seeded_sample_reruns_identically() {
    let frame = sales_frame();
    let plan = r#"{
        "steps": [
            {"id": "s", "operation": "transform", "inputs": ["dataset"],
             "params": {"kind": "sample", "fraction": 0.6, "seed": 7}},
            {"id": "sum", "operation": "aggregate", "inputs": ["s"],
             "params": {"column": "revenue", "func": "sum"}}
        ]
    }"#;

    let first = ArtifactStore::new();
    let second = ArtifactStore::new();
    run_plan(plan, &frame, &first);
    run_plan(plan, &frame, &second);

    for id in ["s", "sum"] {
        let a = first.get(&id.into()).unwrap();
        let b = second.get(&id.into()).unwrap();
        let fa = a.payload.as_ref().unwrap().as_table().unwrap();
        let fb = b.payload.as_ref().unwrap().as_table().unwrap();
        assert_eq!(fa.row_count(), fb.row_count());
        for (name, col) in fa.columns() {
            let other = fb.column(name).unwrap();
            for row in 0..fa.row_count() {
                assert_eq!(col.value(row), other.value(row), "{id}.{name}[{row}]");
            }
        }
    }
}

#[test]
fn store_lists_artifacts_in_execution_order() {
    let frame = sales_frame();
    let store = ArtifactStore::new();
    let plan = r#"{
        "steps": [
            {"id": "late", "operation": "narrate", "inputs": ["early"]},
            {"id": "early", "operation": "filter", "inputs": ["dataset"],
             "params": {"column": "revenue", "op": ">=", "value": 0}}
        ]
    }"#;

    run_plan(plan, &frame, &store);
    let ids: Vec<String> = store
        .list()
        .into_iter()
        .map(|a| a.step_id.to_string())
        .collect();
    assert_eq!(ids, vec!["early".to_string(), "late".to_string()]);
}

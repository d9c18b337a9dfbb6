//! Plan wire contract and payload extraction
//!
//! The language-model service returns raw text that is *expected* to contain
//! a JSON plan, usually wrapped in prose or a fenced code block. Extraction
//! never assumes the whole response is JSON: it tries fenced blocks first,
//! then the first balanced top-level object, then the raw text.

use crate::step::{
    AggregateParams, FilterParams, NarrateParams, StatTestParams, TransformParams,
    VisualizeParams,
};
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

/// Input reference naming the session dataset on the wire
pub const DATASET_REF: &str = "dataset";

/// Raw plan as decoded from model output, before validation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RawPlan {
    /// Steps in declaration order
    pub steps: Vec<RawStep>,
}

/// One raw step
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RawStep {
    /// Unique step id
    pub id: String,
    /// Operation kind: filter | aggregate | transform | stat_test |
    /// visualize | narrate
    pub operation: String,
    /// Prior step ids, or the literal `"dataset"`
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Operation-specific parameter record
    #[serde(default)]
    pub params: serde_json::Value,
}

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("static regex"));

/// Pull the most plausible JSON payload out of raw model text
///
/// Order of attempts mirrors how models actually answer: the longest fenced
/// code block, then the first balanced `{ ... }` object, then the text
/// as-is (strict decoding downstream rejects garbage).
#[must_use]
pub fn extract_payload(raw: &str) -> &str {
    if let Some(block) = FENCED_BLOCK
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .max_by_key(|m| m.len())
    {
        return block.as_str();
    }
    if let Some(obj) = balanced_object(raw) {
        return obj;
    }
    raw.trim()
}

/// First balanced top-level `{...}` slice, ignoring braces inside strings
fn balanced_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (off, ch) in raw[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + off]);
                }
            }
            _ => {}
        }
    }
    None
}

/// JSON Schema bundle for the wire contract, embedded into generation
/// prompts so the model sees the exact shape it must produce
#[must_use]
pub fn wire_schema() -> serde_json::Value {
    let params = serde_json::json!({
        "filter": schema_for!(FilterParams),
        "aggregate": schema_for!(AggregateParams),
        "transform": schema_for!(TransformParams),
        "stat_test": schema_for!(StatTestParams),
        "visualize": schema_for!(VisualizeParams),
        "narrate": schema_for!(NarrateParams),
    });
    serde_json::json!({
        "plan": schema_for!(RawPlan),
        "params_by_operation": params,
    })
}

//! Step output reconciliation.
//!
//! A job snapshot carries per-step outputs in several incompatible shapes:
//! rich structured objects, JSON-encoded strings of those objects, plain
//! strings, and a pseudo-protocol text form for human-in-the-loop questions.
//! `resolve` normalizes all of them into one tagged variant so downstream
//! code never re-inspects raw shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::models::{Job, JobStatus, Step};

/// Maximum number of one-click options offered for a parsed question.
pub const MAX_QUESTION_OPTIONS: usize = 8;

const QUESTION_PREFIX: &str = "QUESTION:";
const OPTIONS_MARKER: &str = "available options:";

/// Rich structured step output, as produced by newer orchestrator builds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RichOutput {
    #[serde(default)]
    pub thought_process: Option<String>,

    pub content: String,

    /// Scalar metrics, carried verbatim in their native JSON form.
    #[serde(default)]
    pub metrics: HashMap<String, Value>,

    #[serde(default)]
    pub insights: Vec<String>,

    #[serde(default)]
    pub visualizations: Vec<Visualization>,

    #[serde(default)]
    pub aggregate_rows: Option<Value>,

    #[serde(default)]
    pub raw_rows: Option<Value>,

    #[serde(default)]
    pub download_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Visualization {
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub data: Option<Value>,
}

/// Question extracted from the HIL pseudo-protocol text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    pub question: String,
    pub options: Vec<String>,
}

/// Rendering-ready representation of one step's output.
///
/// Produced once by `resolve` and consumed downstream only through this
/// variant.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderableOutput {
    Rich(RichOutput),
    Raw { text: String },
    Question { question: String, options: Vec<String> },
}

/// Decide which output representation to present for `step` and normalize
/// it. Returns `None` when the step's output must not be shown yet.
///
/// Pure function of its inputs; calling it twice yields identical results.
pub fn resolve(step: &Step, step_index: usize, job: &Job) -> Option<RenderableOutput> {
    if !is_output_visible(step_index, job) {
        return None;
    }

    if let Some(value) = job.step_outputs.get(&step.name) {
        if let Some(output) = resolve_step_value(value) {
            return Some(output);
        }
    }

    let raw = job
        .context
        .get(&step.output_key)
        .map(|v| value_as_text(v))?;
    Some(classify_raw(raw))
}

/// A step's output is shown if the step already completed, or it is the
/// current step and the job is waiting for user input. Future steps never
/// show output, even if stale data exists for them.
fn is_output_visible(step_index: usize, job: &Job) -> bool {
    if job.current_step_index > step_index {
        return true;
    }
    job.current_step_index == step_index && job.status == JobStatus::WaitingForUser
}

fn resolve_step_value(value: &Value) -> Option<RenderableOutput> {
    match value {
        Value::Object(_) => match serde_json::from_value::<RichOutput>(value.clone()) {
            Ok(rich) => Some(RenderableOutput::Rich(rich)),
            // An object without the rich shape is still worth showing.
            Err(_) => Some(classify_raw(value.to_string())),
        },
        Value::String(text) => {
            // Legacy double-encoded outputs arrive as JSON strings. Parse
            // failure is not an error; it is evidence the value is raw text.
            match serde_json::from_str::<RichOutput>(text) {
                Ok(rich) => Some(RenderableOutput::Rich(rich)),
                Err(_) => Some(classify_raw(text.clone())),
            }
        }
        Value::Null => None,
        other => Some(classify_raw(value_as_text(other))),
    }
}

fn classify_raw(text: String) -> RenderableOutput {
    match parse_question(&text) {
        Some(parsed) => RenderableOutput::Question {
            question: parsed.question,
            options: parsed.options,
        },
        None => RenderableOutput::Raw { text },
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse the HIL question pseudo-protocol:
/// `"QUESTION: <text> Available options: [a, b, c]"`.
///
/// The options marker is matched case-insensitively; each option is
/// trimmed, stripped of surrounding quotes, empties are discarded, and the
/// list is capped at [`MAX_QUESTION_OPTIONS`].
pub fn parse_question(text: &str) -> Option<ParsedQuestion> {
    let trimmed = text.trim_start();
    let body = trimmed.strip_prefix(QUESTION_PREFIX)?;

    let (question, options) = match find_options_marker(body) {
        Some(pos) => {
            let question = body[..pos].trim().to_string();
            let tail = &body[pos + OPTIONS_MARKER.len()..];
            (question, parse_options(tail))
        }
        None => (body.trim().to_string(), Vec::new()),
    };

    Some(ParsedQuestion { question, options })
}

/// Byte offset of the options marker, matched case-insensitively. The
/// marker is pure ASCII, so a byte-wise scan yields offsets that stay
/// valid for the original string even when the question text is
/// multi-byte (lowercasing the whole string can change byte lengths,
/// e.g. U+212A KELVIN SIGN).
fn find_options_marker(body: &str) -> Option<usize> {
    let marker = OPTIONS_MARKER.as_bytes();
    body.as_bytes()
        .windows(marker.len())
        .position(|window| window.eq_ignore_ascii_case(marker))
}

fn parse_options(tail: &str) -> Vec<String> {
    let open = match tail.find('[') {
        Some(i) => i,
        None => return Vec::new(),
    };
    let close = match tail[open..].find(']') {
        Some(i) => open + i,
        None => return Vec::new(),
    };

    tail[open + 1..close]
        .split(',')
        .map(|opt| opt.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|opt| !opt.is_empty())
        .take(MAX_QUESTION_OPTIONS)
        .map(|opt| opt.to_string())
        .collect()
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Remote job lifecycle status.
///
/// Transitions only along `running -> waiting_for_user -> running -> ... ->
/// {completed|failed}`. Once terminal, the job is immutable from the
/// client's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    WaitingForUser,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::WaitingForUser => write!(f, "waiting_for_user"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Structured prompt describing what approval is needed, when the
/// orchestrator supplies one alongside `waiting_for_user`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PendingToolCall {
    #[serde(default)]
    pub tool_name: Option<String>,

    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default)]
    pub payload: Option<Value>,
}

/// The remote execution's current snapshot, as last observed by the client.
///
/// The orchestrator is the source of truth; the client only ever replaces
/// whole snapshots, never mutates individual fields in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,

    pub workflow_id: String,

    pub status: JobStatus,

    #[serde(default)]
    pub current_step_index: usize,

    /// Free-form key -> value map produced by steps.
    #[serde(default)]
    pub context: HashMap<String, Value>,

    /// Ordered, append-only log lines.
    #[serde(default)]
    pub logs: Vec<String>,

    /// Step name -> produced artifact. Values may be rich objects, raw
    /// strings, or JSON-encoded strings of rich objects; the resolver
    /// reconciles them.
    #[serde(default)]
    pub step_outputs: HashMap<String, Value>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub pending_tool_call: Option<PendingToolCall>,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_waiting_for_user(&self) -> bool {
        self.status == JobStatus::WaitingForUser
    }
}

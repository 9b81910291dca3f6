use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::JobStatus;

/// Client-local lifecycle summary of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Running,
    AwaitingApproval,
    Succeeded,
    Failed,
}

impl RunStatus {
    /// Map the remote job status onto the run record's vocabulary.
    pub fn from_job(status: JobStatus) -> Self {
        match status {
            JobStatus::Running => RunStatus::Running,
            JobStatus::WaitingForUser => RunStatus::AwaitingApproval,
            JobStatus::Completed => RunStatus::Succeeded,
            JobStatus::Failed => RunStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::AwaitingApproval => write!(f, "awaiting-approval"),
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// History entry for one launched job. Created when a run starts, mutated
/// only by the owning poll loop or event consumer, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub workflow_name: String,
    /// Execution backend identifier (e.g. "orchestrator", "simulator").
    pub engine: String,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
}

impl RunRecord {
    pub fn new(workflow_name: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_name: workflow_name.into(),
            engine: engine.into(),
            started_at: Utc::now(),
            status: RunStatus::Running,
        }
    }
}

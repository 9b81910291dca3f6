//! Client-local run history.
//!
//! An in-memory, ordered, append-only list of run records. Records are
//! created when a run starts and mutated only by the owning poll loop or
//! event consumer; they are never deleted.

use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{EventEnvelope, EventKind, JobStatus, RunRecord, RunStatus};

#[derive(Default)]
pub struct RunRegistry {
    runs: RwLock<Vec<RunRecord>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly launched run and return its id.
    pub fn record_start(
        &self,
        workflow_name: impl Into<String>,
        engine: impl Into<String>,
    ) -> Uuid {
        let record = RunRecord::new(workflow_name, engine);
        let id = record.id;
        let mut runs = self.runs.write().expect("run registry poisoned");
        runs.push(record);
        debug!(run_id = %id, "run recorded");
        id
    }

    /// Apply a polled job status to a run record. Terminal records are
    /// immutable; late-arriving snapshots cannot reopen them.
    pub fn apply_status(&self, run_id: Uuid, status: JobStatus) {
        self.update(run_id, RunStatus::from_job(status));
    }

    /// Apply one event envelope to a run record. Used by event-stream
    /// driven runs; the mapping mirrors `apply_status`.
    pub fn apply_event(&self, run_id: Uuid, envelope: &EventEnvelope) {
        match envelope.kind {
            EventKind::ApprovalRequest => self.update(run_id, RunStatus::AwaitingApproval),
            EventKind::ApprovalDecision => self.update(run_id, RunStatus::Running),
            EventKind::Status => match envelope.terminal_status() {
                Some("failed") => self.update(run_id, RunStatus::Failed),
                Some("completed") => self.update(run_id, RunStatus::Succeeded),
                _ => {}
            },
            _ => {}
        }
    }

    fn update(&self, run_id: Uuid, status: RunStatus) {
        let mut runs = self.runs.write().expect("run registry poisoned");
        if let Some(record) = runs.iter_mut().find(|r| r.id == run_id) {
            if record.status.is_terminal() {
                return;
            }
            record.status = status;
        }
    }

    pub fn get(&self, run_id: Uuid) -> Option<RunRecord> {
        let runs = self.runs.read().expect("run registry poisoned");
        runs.iter().find(|r| r.id == run_id).cloned()
    }

    /// All records in launch order.
    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.read().expect("run registry poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.runs.read().expect("run registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Human-in-the-loop approval gate.
//!
//! Sub-state-machine that pauses on `waiting_for_user`, captures operator
//! feedback, and resumes execution with an explicit decision. The resume
//! trigger policy is the two-button variant: the decision alone selects
//! approve vs. reject, and feedback text rides along with either.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::JobClient;
use crate::error::{OverseerError, OverseerResult};
use crate::models::Job;

/// Operator decision for a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn approved(&self) -> bool {
        matches!(self, Decision::Approve)
    }
}

/// What the operator is being asked, when the job snapshot carries enough
/// structure to say.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GatePrompt {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    NotWaiting,
    AwaitingDecision {
        step_index: usize,
        prompt: Option<GatePrompt>,
    },
    Submitting,
}

pub struct ApprovalGate {
    client: Arc<JobClient>,
    job_id: String,
    state: GateState,
    feedback: String,
    last_error: Option<String>,
}

impl ApprovalGate {
    pub fn new(client: Arc<JobClient>, job_id: impl Into<String>) -> Self {
        Self {
            client,
            job_id: job_id.into(),
            state: GateState::NotWaiting,
            feedback: String::new(),
            last_error: None,
        }
    }

    /// Feed the latest job snapshot (and, when available, the resolved
    /// question for the current step) into the gate.
    pub fn observe(&mut self, job: &Job, prompt: Option<GatePrompt>) {
        match (&self.state, job.is_waiting_for_user()) {
            (GateState::NotWaiting, true) => {
                info!(job_id = %self.job_id, step_index = job.current_step_index,
                      "job is waiting for a decision");
                self.state = GateState::AwaitingDecision {
                    step_index: job.current_step_index,
                    prompt: prompt.or_else(|| prompt_from_job(job)),
                };
            }
            // Already awaiting or submitting: keep captured feedback intact.
            (GateState::AwaitingDecision { .. }, true) | (GateState::Submitting, _) => {}
            (GateState::AwaitingDecision { .. }, false) => {
                debug!(job_id = %self.job_id, "job advanced, leaving decision state");
                self.reset();
            }
            (GateState::NotWaiting, false) => {}
        }
    }

    /// Submit the operator's decision. On failure the gate stays in
    /// `AwaitingDecision` with the feedback preserved, so the operator can
    /// retry without retyping.
    pub async fn submit(&mut self, decision: Decision) -> OverseerResult<Job> {
        let previous = match &self.state {
            GateState::AwaitingDecision { .. } => {
                std::mem::replace(&mut self.state, GateState::Submitting)
            }
            _ => {
                return Err(OverseerError::InvalidState(
                    "no approval is pending".to_string(),
                ))
            }
        };

        let result = self
            .client
            .resume(&self.job_id, decision.approved(), &self.feedback)
            .await;

        match result {
            Ok(job) => {
                info!(job_id = %self.job_id, approved = decision.approved(), "resume accepted");
                self.reset();
                Ok(job)
            }
            Err(e) => {
                warn!(job_id = %self.job_id, "resume failed: {}", e);
                self.last_error = Some(e.to_string());
                self.state = previous;
                Err(e)
            }
        }
    }

    pub fn set_feedback(&mut self, feedback: impl Into<String>) {
        self.feedback = feedback.into();
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_awaiting_decision(&self) -> bool {
        matches!(self.state, GateState::AwaitingDecision { .. })
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn reset(&mut self) {
        self.state = GateState::NotWaiting;
        self.feedback.clear();
        self.last_error = None;
    }
}

/// Label for the approve action; the state machine is identical either way,
/// only the copy changes on the workflow's last step.
pub fn approve_label(is_last_step: bool) -> &'static str {
    if is_last_step {
        "approve & complete"
    } else {
        "approve & continue"
    }
}

fn prompt_from_job(job: &Job) -> Option<GatePrompt> {
    let pending = job.pending_tool_call.as_ref()?;
    let question = pending
        .prompt
        .clone()
        .or_else(|| pending.tool_name.clone())?;
    Some(GatePrompt {
        question,
        options: Vec::new(),
    })
}

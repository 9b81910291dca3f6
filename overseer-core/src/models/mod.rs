mod event;
mod job;
mod run;
mod workflow;

pub use event::{EventEnvelope, EventKind};
pub use job::{Job, JobStatus, PendingToolCall};
pub use run::{RunRecord, RunStatus};
pub use workflow::{Step, WorkflowDefinition};

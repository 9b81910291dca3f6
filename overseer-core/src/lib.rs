#![allow(clippy::type_complexity, clippy::len_zero)]

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod models;
pub mod poller;
pub mod registry;
pub mod resolver;

pub use client::{ChatReply, JobClient};
pub use config::{
    get_config_dir, ConfigLoadError, EventSource, EventsConfig, LoggingConfig, OrchestratorConfig,
    OverseerConfig, PollingConfig,
};
pub use error::{OverseerError, OverseerResult};
pub use events::{stream_for_config, EventStream, RemoteEventStream, SimulatedEventStream};
pub use gate::{approve_label, ApprovalGate, Decision, GatePrompt, GateState};
pub use models::{
    EventEnvelope, EventKind, Job, JobStatus, PendingToolCall, RunRecord, RunStatus, Step,
    WorkflowDefinition,
};
pub use poller::{should_apply, PollHandle, PollingController};
pub use registry::RunRegistry;
pub use resolver::{
    parse_question, resolve, ParsedQuestion, RenderableOutput, RichOutput, Visualization,
    MAX_QUESTION_OPTIONS,
};

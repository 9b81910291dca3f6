use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of work in a workflow definition, executed by an agent or team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,

    #[serde(default, rename = "type")]
    pub step_type: String,

    /// Agent or team reference that executes the step.
    #[serde(default)]
    pub agent: Option<String>,

    /// Input template, resolved server-side against the job context.
    #[serde(default)]
    pub input: Option<Value>,

    /// Key under which the step writes its raw output into `job.context`.
    #[serde(default)]
    pub output_key: String,

    #[serde(default)]
    pub requires_approval: bool,
}

/// Static plan supplied once at job start; immutable during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl WorkflowDefinition {
    /// Whether `step_index` refers to the workflow's last step. Used by the
    /// approval gate to pick its action label.
    pub fn is_last_step(&self, step_index: usize) -> bool {
        !self.steps.is_empty() && step_index + 1 == self.steps.len()
    }
}

//! Typed request/response wrapper over the remote job API.
//!
//! The client holds no job state of its own; every call except `start` is
//! idempotent-safe to retry. Retry policy lives in the polling controller,
//! never here.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::OrchestratorConfig;
use crate::error::{OverseerError, OverseerResult};
use crate::models::{Job, WorkflowDefinition};

/// Per-workflow start guard. Set before the call, cleared on failure; a
/// success becomes `Active` rather than clearing, so a second start for the
/// same workflow stays blocked for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StartGuard {
    InFlight,
    Active { job_id: String },
}

/// Normalized reply from the `/chat` endpoint.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub context: Option<Value>,
}

pub struct JobClient {
    http: Client,
    base_url: String,
    starts: Mutex<HashMap<String, StartGuard>>,
}

impl JobClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: normalize_base_url(base_url.into()),
            starts: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> OverseerResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| OverseerError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: normalize_base_url(config.base_url.clone()),
            starts: Mutex::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Launch a job for `workflow_id`. Exactly one start may be in flight
    /// per workflow id; callers that race get `Conflict`.
    pub async fn start(&self, workflow_id: &str, input_data: Value) -> OverseerResult<Job> {
        {
            let mut starts = self.starts.lock().expect("start guard poisoned");
            if starts.contains_key(workflow_id) {
                return Err(OverseerError::Conflict(workflow_id.to_string()));
            }
            starts.insert(workflow_id.to_string(), StartGuard::InFlight);
        }

        let result: OverseerResult<Job> = self
            .post_json(
                "/execute",
                &json!({
                    "workflow_id": workflow_id,
                    "input_data": input_data,
                }),
            )
            .await;

        let mut starts = self.starts.lock().expect("start guard poisoned");
        match &result {
            Ok(job) => {
                info!(job_id = %job.id, workflow_id, "job started");
                starts.insert(
                    workflow_id.to_string(),
                    StartGuard::Active {
                        job_id: job.id.clone(),
                    },
                );
            }
            Err(_) => {
                starts.remove(workflow_id);
            }
        }

        result
    }

    /// Fetch the current job snapshot. Safe to call unboundedly; never
    /// mutates server state.
    pub async fn get_status(&self, job_id: &str) -> OverseerResult<Job> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        debug!(job_id, "fetching job status");
        let response = self.http.get(&url).send().await?;
        decode_response(response).await
    }

    /// Resume a job waiting for user input with an explicit decision and
    /// optional free-text feedback. The server is authoritative about
    /// whether the job is actually `waiting_for_user`.
    pub async fn resume(
        &self,
        job_id: &str,
        approved: bool,
        feedback: &str,
    ) -> OverseerResult<Job> {
        info!(job_id, approved, "resuming job");
        self.post_json(
            "/resume",
            &json!({
                "job_id": job_id,
                "user_input": feedback,
                "approved": approved,
            }),
        )
        .await
    }

    /// Send a conversational message about a job. Both observed reply
    /// shapes are normalized into [`ChatReply`].
    pub async fn chat(&self, job_id: &str, message: &str) -> OverseerResult<ChatReply> {
        let raw: Value = self
            .post_json(
                "/chat",
                &json!({
                    "job_id": job_id,
                    "message": message,
                }),
            )
            .await?;
        normalize_chat_reply(raw)
    }

    /// Ask the orchestrator to draft a workflow plan from a free-text
    /// request.
    pub async fn create_plan(
        &self,
        user_request: &str,
        data_sources: Option<Vec<String>>,
    ) -> OverseerResult<WorkflowDefinition> {
        let mut body = json!({ "user_request": user_request });
        if let Some(sources) = data_sources {
            body["data_sources"] = json!(sources);
        }
        self.post_json("/plan", &body).await
    }

    /// Fetch granular telemetry envelopes for a job, starting after
    /// sequence number `after`. Used by the live event stream adapter.
    pub async fn get_events(
        &self,
        job_id: &str,
        after: u64,
    ) -> OverseerResult<Vec<crate::models::EventEnvelope>> {
        let url = format!("{}/jobs/{}/events?after={}", self.base_url, job_id, after);
        let response = self.http.get(&url).send().await?;
        decode_response(response).await
    }

    /// Forget the start guard for `workflow_id`, allowing a fresh start in
    /// a new session. Idempotent.
    pub fn release_workflow(&self, workflow_id: &str) {
        let mut starts = self.starts.lock().expect("start guard poisoned");
        starts.remove(workflow_id);
    }

    /// Job id recorded by a successful start for `workflow_id`, if any.
    pub fn active_job(&self, workflow_id: &str) -> Option<String> {
        let starts = self.starts.lock().expect("start guard poisoned");
        match starts.get(workflow_id) {
            Some(StartGuard::Active { job_id }) => Some(job_id.clone()),
            _ => None,
        }
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> OverseerResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.post(&url).json(body).send().await?;
        decode_response(response).await
    }
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> OverseerResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let detail = response
        .text()
        .await
        .ok()
        .and_then(|body| extract_detail(&body));
    Err(error_for_status(status, detail))
}

/// HTTP error bodies carry `{ "detail": string }`; surface it verbatim when
/// present.
fn extract_detail(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
}

fn error_for_status(status: StatusCode, detail: Option<String>) -> OverseerError {
    let message = detail.unwrap_or_else(|| format!("request failed ({})", status.as_u16()));
    match status {
        StatusCode::NOT_FOUND => OverseerError::JobNotFound(message),
        StatusCode::CONFLICT | StatusCode::BAD_REQUEST => OverseerError::InvalidState(message),
        _ => OverseerError::Backend(message),
    }
}

fn normalize_chat_reply(raw: Value) -> OverseerResult<ChatReply> {
    #[derive(Deserialize)]
    struct DirectReply {
        response: String,
        #[serde(default)]
        context: Option<Value>,
    }

    if let Ok(direct) = serde_json::from_value::<DirectReply>(raw.clone()) {
        return Ok(ChatReply {
            response: direct.response,
            context: direct.context,
        });
    }

    if let Some(messages) = raw.get("messages").and_then(|m| m.as_array()) {
        let last = messages
            .last()
            .ok_or_else(|| OverseerError::Decode("chat reply carried no messages".to_string()))?;
        let text = last
            .get("content")
            .and_then(|c| c.as_str())
            .or_else(|| last.as_str())
            .ok_or_else(|| OverseerError::Decode("chat message had no content".to_string()))?;
        return Ok(ChatReply {
            response: text.to_string(),
            context: None,
        });
    }

    Err(OverseerError::Decode(
        "unrecognized chat reply shape".to_string(),
    ))
}

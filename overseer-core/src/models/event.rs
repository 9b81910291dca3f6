use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Tag of one orchestration telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Plan,
    Sql,
    Rag,
    Reasoning,
    Response,
    ApprovalRequest,
    ApprovalDecision,
    Status,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Plan => "plan",
            EventKind::Sql => "sql",
            EventKind::Rag => "rag",
            EventKind::Reasoning => "reasoning",
            EventKind::Response => "response",
            EventKind::ApprovalRequest => "approval-request",
            EventKind::ApprovalDecision => "approval-decision",
            EventKind::Status => "status",
        };
        write!(f, "{}", name)
    }
}

/// One timestamped, typed notification describing orchestration progress.
///
/// Ordering within one run's stream is the only guarantee; envelopes from
/// different runs must not be assumed synchronized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub kind: EventKind,

    pub message: String,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub detail: Option<Value>,
}

impl EventEnvelope {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Terminal status carried in `detail.status`, when this is a `status`
    /// envelope that ends the run.
    pub fn terminal_status(&self) -> Option<&str> {
        if self.kind != EventKind::Status {
            return None;
        }
        self.detail
            .as_ref()
            .and_then(|d| d.get("status"))
            .and_then(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_serde_round_trip() {
        let raw = serde_json::to_string(&EventKind::ApprovalRequest).unwrap();
        assert_eq!(raw, "\"approval-request\"");
        let kind: EventKind = serde_json::from_str("\"approval-decision\"").unwrap();
        assert_eq!(kind, EventKind::ApprovalDecision);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(EventKind::Plan.to_string(), "plan");
        assert_eq!(EventKind::ApprovalRequest.to_string(), "approval-request");
        assert_eq!(EventKind::Status.to_string(), "status");
    }

    #[test]
    fn test_terminal_status() {
        let done = EventEnvelope::new(EventKind::Status, "run finished")
            .with_detail(json!({"status": "failed"}));
        assert_eq!(done.terminal_status(), Some("failed"));

        let progress = EventEnvelope::new(EventKind::Sql, "running query");
        assert_eq!(progress.terminal_status(), None);

        let no_detail = EventEnvelope::new(EventKind::Status, "checkpoint");
        assert_eq!(no_detail.terminal_status(), None);
    }
}

//! Deterministic local event generator.
//!
//! Used when no live streaming channel is configured. Emits the canonical
//! step sequence, pauses on a single approval gate, and honors the exact
//! subscriber contract of the live adapter.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, watch, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use super::EventStream;
use crate::error::OverseerResult;
use crate::models::{EventEnvelope, EventKind};

const CHANNEL_CAPACITY: usize = 64;

struct SimDecision {
    approved: bool,
    reason: Option<String>,
}

pub struct SimulatedEventStream {
    events_tx: broadcast::Sender<EventEnvelope>,
    pending: std::sync::Arc<Mutex<Option<oneshot::Sender<SimDecision>>>>,
    shutdown_tx: watch::Sender<bool>,
    step_delay: Duration,
    started: AtomicBool,
}

impl SimulatedEventStream {
    pub fn new(step_delay: Duration) -> Self {
        let (events_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            events_tx,
            pending: std::sync::Arc::new(Mutex::new(None)),
            shutdown_tx,
            step_delay,
            started: AtomicBool::new(false),
        }
    }

    async fn decide(&self, approved: bool, reason: Option<String>) {
        let mut pending = self.pending.lock().await;
        match pending.take() {
            Some(tx) => {
                debug!(approved, "simulator decision submitted");
                let _ = tx.send(SimDecision { approved, reason });
            }
            // No approval pending: guard against double-submission races.
            None => debug!(approved, "no approval pending, ignoring decision"),
        }
    }
}

#[async_trait]
impl EventStream for SimulatedEventStream {
    fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let events_tx = self.events_tx.clone();
        let pending = self.pending.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let step_delay = self.step_delay;

        tokio::spawn(async move {
            run_script(events_tx, pending, shutdown_rx, step_delay).await;
        });
    }

    fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events_tx.subscribe()
    }

    async fn approve(&self, reason: Option<String>) -> OverseerResult<()> {
        self.decide(true, reason).await;
        Ok(())
    }

    async fn reject(&self, reason: Option<String>) -> OverseerResult<()> {
        self.decide(false, reason).await;
        Ok(())
    }

    fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

struct Emitter {
    events_tx: broadcast::Sender<EventEnvelope>,
    last_timestamp: DateTime<Utc>,
}

impl Emitter {
    fn emit(&mut self, kind: EventKind, message: &str, detail: Option<serde_json::Value>) {
        // Timestamps must be strictly increasing within the run.
        let now = Utc::now();
        let timestamp = if now > self.last_timestamp {
            now
        } else {
            self.last_timestamp + ChronoDuration::milliseconds(1)
        };
        self.last_timestamp = timestamp;

        let envelope = EventEnvelope {
            id: Uuid::new_v4(),
            kind,
            message: message.to_string(),
            timestamp,
            detail,
        };
        let _ = self.events_tx.send(envelope);
    }
}

async fn run_script(
    events_tx: broadcast::Sender<EventEnvelope>,
    pending: std::sync::Arc<Mutex<Option<oneshot::Sender<SimDecision>>>>,
    mut shutdown_rx: watch::Receiver<bool>,
    step_delay: Duration,
) {
    let mut emitter = Emitter {
        events_tx,
        last_timestamp: Utc::now(),
    };

    emitter.emit(
        EventKind::Plan,
        "planner drafted the execution plan",
        Some(json!({"steps": ["sql", "rag", "reasoning", "response"]})),
    );
    if !pause(step_delay, &mut shutdown_rx).await {
        return;
    }

    // The approval request is queued together with the sql step, so it
    // follows it on the stream with no delay in between.
    emitter.emit(
        EventKind::Sql,
        "running aggregation query against the sales dataset",
        Some(json!({"query": "SELECT region, SUM(amount) FROM sales GROUP BY region"})),
    );
    emitter.emit(
        EventKind::ApprovalRequest,
        "execution paused: approve the generated query to continue",
        Some(json!({"options": ["approve", "reject"]})),
    );

    let (decision_tx, decision_rx) = oneshot::channel();
    *pending.lock().await = Some(decision_tx);

    let decision = tokio::select! {
        result = decision_rx => match result {
            Ok(decision) => decision,
            Err(_) => return,
        },
        _ = shutdown_rx.changed() => return,
    };

    if !decision.approved {
        info!("simulated run rejected by operator");
        emitter.emit(
            EventKind::Status,
            "run stopped after rejection",
            Some(json!({
                "status": "failed",
                "reason": decision.reason,
            })),
        );
        return;
    }

    emitter.emit(
        EventKind::ApprovalDecision,
        "query approved, resuming execution",
        Some(json!({
            "approved": true,
            "reason": decision.reason,
        })),
    );
    if !pause(step_delay, &mut shutdown_rx).await {
        return;
    }

    emitter.emit(
        EventKind::Rag,
        "retrieved 3 supporting documents from the knowledge base",
        Some(json!({"documents": 3})),
    );
    if !pause(step_delay, &mut shutdown_rx).await {
        return;
    }

    emitter.emit(
        EventKind::Reasoning,
        "combining query results with retrieved context",
        None,
    );
    if !pause(step_delay, &mut shutdown_rx).await {
        return;
    }

    emitter.emit(
        EventKind::Response,
        "west region leads revenue; full summary attached",
        Some(json!({"summary": "West region accounts for 42% of total revenue."})),
    );
    emitter.emit(
        EventKind::Status,
        "run finished",
        Some(json!({"status": "completed"})),
    );
}

/// Sleep for `delay`, returning false if the stream was stopped meanwhile.
async fn pause(delay: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    if delay.is_zero() {
        return !*shutdown_rx.borrow();
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = shutdown_rx.changed() => false,
    }
}

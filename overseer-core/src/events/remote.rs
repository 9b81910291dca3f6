//! Live event stream adapter.
//!
//! Bridges the orchestrator's telemetry endpoint onto the same subscriber
//! contract as the simulator. Envelopes are forwarded strictly in the order
//! the server returns them; decisions delegate to the resume endpoint.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::EventStream;
use crate::client::JobClient;
use crate::error::OverseerResult;
use crate::models::EventEnvelope;

const CHANNEL_CAPACITY: usize = 64;
const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_millis(500);

pub struct RemoteEventStream {
    client: Arc<JobClient>,
    job_id: String,
    events_tx: broadcast::Sender<EventEnvelope>,
    shutdown_tx: watch::Sender<bool>,
    fetch_interval: Duration,
    started: AtomicBool,
}

impl RemoteEventStream {
    pub fn new(client: Arc<JobClient>, job_id: impl Into<String>) -> Self {
        Self::with_fetch_interval(client, job_id, DEFAULT_FETCH_INTERVAL)
    }

    pub fn with_fetch_interval(
        client: Arc<JobClient>,
        job_id: impl Into<String>,
        fetch_interval: Duration,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            client,
            job_id: job_id.into(),
            events_tx,
            shutdown_tx,
            fetch_interval,
            started: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EventStream for RemoteEventStream {
    fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let client = self.client.clone();
        let job_id = self.job_id.clone();
        let events_tx = self.events_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let fetch_interval = self.fetch_interval;

        tokio::spawn(async move {
            let mut ticker = interval(fetch_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cursor: u64 = 0;

            'outer: loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match client.get_events(&job_id, cursor).await {
                            Ok(envelopes) => {
                                for envelope in envelopes {
                                    cursor += 1;
                                    let terminal = envelope.terminal_status().is_some();
                                    let _ = events_tx.send(envelope);
                                    if terminal {
                                        info!(job_id, "event stream reached terminal status");
                                        break 'outer;
                                    }
                                }
                            }
                            // Transient; keep fetching on the next tick.
                            Err(e) => {
                                warn!(job_id, "event fetch failed, will retry: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!(job_id, "event stream cancelled");
                        break;
                    }
                }
            }
        });
    }

    fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events_tx.subscribe()
    }

    async fn approve(&self, reason: Option<String>) -> OverseerResult<()> {
        self.client
            .resume(&self.job_id, true, reason.as_deref().unwrap_or_default())
            .await?;
        Ok(())
    }

    async fn reject(&self, reason: Option<String>) -> OverseerResult<()> {
        self.client
            .resume(&self.job_id, false, reason.as_deref().unwrap_or_default())
            .await?;
        Ok(())
    }

    fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

//! Ordered, multi-subscriber event streams.
//!
//! One consumer contract, two providers: a deterministic local simulator
//! for demos and tests, and an adapter over the orchestrator's telemetry
//! endpoint. Consumers never branch on which one they were handed.

mod remote;
mod simulator;

pub use remote::RemoteEventStream;
pub use simulator::SimulatedEventStream;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::client::JobClient;
use crate::config::{EventSource, EventsConfig};
use crate::error::{OverseerError, OverseerResult};
use crate::models::EventEnvelope;

/// Ordered, multi-subscriber stream of orchestration telemetry for one run.
///
/// Dropping a receiver unsubscribes; that is synchronous and idempotent.
/// `approve` and `reject` are no-ops when no approval is pending, which
/// guards against double-submission races from rapid interaction.
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Begin emission. Subscribers registered before `start` see the full
    /// sequence. Calling it again is a no-op.
    fn start(&self);

    fn subscribe(&self) -> broadcast::Receiver<EventEnvelope>;

    async fn approve(&self, reason: Option<String>) -> OverseerResult<()>;

    async fn reject(&self, reason: Option<String>) -> OverseerResult<()>;

    /// Stop emission. Synchronous and idempotent, safe after the stream
    /// already finished on its own.
    fn stop(&self);
}

/// Construct the configured event stream provider. `job_id` is required for
/// the live source, ignored by the simulator.
pub fn stream_for_config(
    config: &EventsConfig,
    client: Arc<JobClient>,
    job_id: Option<&str>,
) -> OverseerResult<Arc<dyn EventStream>> {
    match config.source {
        EventSource::Simulated => Ok(Arc::new(SimulatedEventStream::new(Duration::from_millis(
            config.sim_step_delay_ms,
        )))),
        EventSource::Live => {
            let job_id = job_id.ok_or_else(|| {
                OverseerError::InvalidConfigValue {
                    key: "events.source".to_string(),
                    message: "live event stream requires a job id".to_string(),
                }
            })?;
            Ok(Arc::new(RemoteEventStream::new(client, job_id)))
        }
    }
}

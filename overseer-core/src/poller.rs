//! Polling lifecycle for launched jobs.
//!
//! Owns exactly one poll loop per job id. Snapshots pass a watermark check
//! before being published, so racing status fetches can never walk the
//! displayed state backwards or reopen a terminal job.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::JobClient;
use crate::models::Job;
use crate::registry::RunRegistry;

/// Subscription to one job's polled snapshots.
#[derive(Clone)]
pub struct PollHandle {
    pub job_id: String,
    snapshots: watch::Receiver<Option<Job>>,
}

impl PollHandle {
    /// A fresh receiver over the snapshot channel. The latest snapshot is
    /// retained, so new subscribers see current state immediately.
    pub fn snapshots(&self) -> watch::Receiver<Option<Job>> {
        self.snapshots.clone()
    }

    /// The most recently applied snapshot, if any tick has succeeded yet.
    pub fn latest(&self) -> Option<Job> {
        self.snapshots.borrow().clone()
    }
}

struct ActivePoll {
    shutdown: Option<oneshot::Sender<()>>,
    snapshots: watch::Receiver<Option<Job>>,
}

pub struct PollingController {
    client: Arc<JobClient>,
    registry: Arc<RunRegistry>,
    poll_interval: Duration,
    active: Arc<Mutex<HashMap<String, ActivePoll>>>,
}

impl PollingController {
    pub fn new(client: Arc<JobClient>, registry: Arc<RunRegistry>, poll_interval: Duration) -> Self {
        Self {
            client,
            registry,
            poll_interval,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Begin polling `job_id`, mirroring statuses into the run record
    /// `run_id`. At most one loop exists per job id: re-entry with an id
    /// that is already being polled returns the existing subscription
    /// instead of spawning a duplicate.
    pub fn watch(&self, job_id: &str, run_id: Uuid) -> PollHandle {
        let mut active = self.active.lock().expect("poll map poisoned");
        if let Some(existing) = active.get(job_id) {
            debug!(job_id, "poll loop already active, returning subscription");
            return PollHandle {
                job_id: job_id.to_string(),
                snapshots: existing.snapshots.clone(),
            };
        }

        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        active.insert(
            job_id.to_string(),
            ActivePoll {
                shutdown: Some(shutdown_tx),
                snapshots: snapshot_rx.clone(),
            },
        );
        drop(active);

        let client = self.client.clone();
        let registry = self.registry.clone();
        let poll_interval = self.poll_interval;
        let active_map = self.active.clone();
        let job = job_id.to_string();

        tokio::spawn(async move {
            poll_loop(
                client,
                registry,
                job.clone(),
                run_id,
                poll_interval,
                snapshot_tx,
                shutdown_rx,
            )
            .await;
            // Common cleanup for terminal status and external cancellation.
            let mut active = active_map.lock().expect("poll map poisoned");
            active.remove(&job);
            info!(job_id = %job, "polling stopped");
        });

        PollHandle {
            job_id: job_id.to_string(),
            snapshots: snapshot_rx,
        }
    }

    /// Stop the poll loop for `job_id`. Synchronous and idempotent: safe to
    /// call repeatedly and safe after the loop already stopped itself.
    pub fn stop(&self, job_id: &str) {
        let mut active = self.active.lock().expect("poll map poisoned");
        if let Some(mut entry) = active.remove(job_id) {
            if let Some(tx) = entry.shutdown.take() {
                let _ = tx.send(());
            }
        }
    }

    pub fn is_polling(&self, job_id: &str) -> bool {
        self.active
            .lock()
            .expect("poll map poisoned")
            .contains_key(job_id)
    }
}

async fn poll_loop(
    client: Arc<JobClient>,
    registry: Arc<RunRegistry>,
    job_id: String,
    run_id: Uuid,
    poll_interval: Duration,
    snapshot_tx: watch::Sender<Option<Job>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_applied: Option<Job> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match client.get_status(&job_id).await {
                    Ok(job) => {
                        if !should_apply(last_applied.as_ref(), &job) {
                            debug!(job_id, "discarding stale snapshot");
                            continue;
                        }

                        let terminal = job.is_terminal();
                        registry.apply_status(run_id, job.status);
                        let _ = snapshot_tx.send(Some(job.clone()));
                        last_applied = Some(job);

                        if terminal {
                            debug!(job_id, "job reached terminal status");
                            break;
                        }
                    }
                    // A failed tick is transient; keep polling.
                    Err(e) => {
                        warn!(job_id, "status fetch failed, will retry: {}", e);
                    }
                }
            }
            _ = &mut shutdown_rx => {
                debug!(job_id, "poll loop cancelled");
                break;
            }
        }
    }
}

/// Watermark check for racing snapshots (fetch-completion order is not
/// request-issue order). A terminal snapshot is never replaced. A snapshot
/// with an unchanged status may not move the step index backwards; a status
/// change is always accepted, which is what lets a deliberate
/// retry-with-feedback rewind (`waiting_for_user` -> `running` with a lower
/// index) through.
pub fn should_apply(previous: Option<&Job>, next: &Job) -> bool {
    let prev = match previous {
        Some(p) => p,
        None => return true,
    };

    if prev.is_terminal() {
        return false;
    }
    if next.is_terminal() {
        return true;
    }
    if next.status != prev.status {
        return true;
    }
    next.current_step_index >= prev.current_step_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use std::collections::HashMap;

    fn job(status: JobStatus, current_step_index: usize) -> Job {
        Job {
            id: "job-1".to_string(),
            workflow_id: "wf-1".to_string(),
            status,
            current_step_index,
            context: HashMap::new(),
            logs: Vec::new(),
            step_outputs: HashMap::new(),
            error: None,
            pending_tool_call: None,
        }
    }

    #[test]
    fn test_first_snapshot_always_applies() {
        assert!(should_apply(None, &job(JobStatus::Running, 0)));
    }

    #[test]
    fn test_terminal_state_never_regresses() {
        let done = job(JobStatus::Completed, 2);
        assert!(!should_apply(Some(&done), &job(JobStatus::Running, 3)));
        assert!(!should_apply(Some(&done), &job(JobStatus::Failed, 2)));
    }

    #[test]
    fn test_terminal_snapshot_always_applies() {
        let running = job(JobStatus::Running, 2);
        assert!(should_apply(Some(&running), &job(JobStatus::Failed, 0)));
        assert!(should_apply(Some(&running), &job(JobStatus::Completed, 2)));
    }

    #[test]
    fn test_stale_same_status_snapshot_is_discarded() {
        let current = job(JobStatus::Running, 2);
        assert!(!should_apply(Some(&current), &job(JobStatus::Running, 1)));
        assert!(should_apply(Some(&current), &job(JobStatus::Running, 2)));
        assert!(should_apply(Some(&current), &job(JobStatus::Running, 3)));
    }

    #[test]
    fn test_retry_rewind_applies_on_status_change() {
        // A retry-with-feedback resume may legitimately reset the step
        // index downward; the status flips at the same time.
        let waiting = job(JobStatus::WaitingForUser, 2);
        assert!(should_apply(Some(&waiting), &job(JobStatus::Running, 0)));
    }
}

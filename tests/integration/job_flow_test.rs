use overseer_core::{
    resolve, ApprovalGate, Decision, JobClient, JobStatus, OverseerError, PollingController,
    RenderableOutput, RunRegistry, RunStatus, Step,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const WAIT: Duration = Duration::from_secs(5);

fn job_body(status: &str, step_index: usize) -> serde_json::Value {
    json!({
        "id": "job-1",
        "workflow_id": "wf-1",
        "status": status,
        "current_step_index": step_index,
        "context": {},
        "logs": [],
        "step_outputs": {},
    })
}

fn question_step() -> Step {
    serde_json::from_value(json!({
        "name": "Step A",
        "type": "sql",
        "output_key": "rows",
        "requires_approval": true,
    }))
    .unwrap()
}

async fn wait_for_status(
    snapshots: &mut tokio::sync::watch::Receiver<Option<overseer_core::Job>>,
    status: JobStatus,
) -> overseer_core::Job {
    timeout(WAIT, async {
        loop {
            snapshots.changed().await.expect("snapshot channel closed");
            let current = snapshots.borrow_and_update().clone();
            if let Some(job) = current {
                if job.status == status {
                    return job;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for status")
}

async fn wait_until_stopped(poller: &PollingController, job_id: &str) {
    timeout(WAIT, async {
        while poller.is_polling(job_id) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("poll loop did not stop");
}

mod approval_flow {
    use super::*;

    #[tokio::test]
    async fn full_run_pauses_on_question_and_completes_after_approval() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_body("running", 0)))
            .mount(&server)
            .await;

        // First poll sees the job still running on step 0.
        Mock::given(method("GET"))
            .and(path("/jobs/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_body("running", 0)))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        // Then the job pauses on a question for the current step.
        let mut waiting = job_body("waiting_for_user", 0);
        waiting["step_outputs"] =
            json!({"Step A": "QUESTION: Proceed with the aggregation? Available options: ['yes', 'no']"});
        Mock::given(method("GET"))
            .and(path("/jobs/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(waiting))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/resume"))
            .and(body_partial_json(json!({
                "job_id": "job-1",
                "approved": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_body("running", 1)))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(JobClient::new(server.uri()));
        let registry = Arc::new(RunRegistry::new());
        let poller = PollingController::new(client.clone(), registry.clone(), POLL_INTERVAL);

        let job = client.start("wf-1", json!({})).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);

        let run_id = registry.record_start("wf-1", "orchestrator");
        let handle = poller.watch(&job.id, run_id);
        let mut snapshots = handle.snapshots();

        let waiting_job = wait_for_status(&mut snapshots, JobStatus::WaitingForUser).await;
        assert_eq!(waiting_job.current_step_index, 0);
        assert_eq!(
            registry.get(run_id).unwrap().status,
            RunStatus::AwaitingApproval
        );

        // The paused step resolves into a one-click question with the
        // quotes stripped from its options.
        let output = resolve(&question_step(), 0, &waiting_job).expect("output hidden");
        match output {
            RenderableOutput::Question { question, options } => {
                assert_eq!(question, "Proceed with the aggregation?");
                assert_eq!(options, vec!["yes".to_string(), "no".to_string()]);
            }
            other => panic!("expected a question, got {:?}", other),
        }

        let mut gate = ApprovalGate::new(client.clone(), &waiting_job.id);
        gate.observe(&waiting_job, None);
        assert!(gate.is_awaiting_decision());

        let resumed = gate.submit(Decision::Approve).await.unwrap();
        assert_eq!(resumed.status, JobStatus::Running);
        assert_eq!(resumed.current_step_index, 1);

        // Swap the backend to a terminal snapshot; the poller picks it up
        // and shuts itself down.
        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/jobs/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_body("completed", 2)))
            .mount(&server)
            .await;

        let done = wait_for_status(&mut snapshots, JobStatus::Completed).await;
        assert!(done.is_terminal());
        wait_until_stopped(&poller, "job-1").await;
        assert_eq!(registry.get(run_id).unwrap().status, RunStatus::Succeeded);

        // A terminal record never reopens, whatever arrives later.
        registry.apply_status(run_id, JobStatus::Running);
        assert_eq!(registry.get(run_id).unwrap().status, RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn resume_rejection_carries_feedback() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/resume"))
            .and(body_partial_json(json!({
                "approved": false,
                "user_input": "use last quarter instead",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_body("running", 0)))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(JobClient::new(server.uri()));
        let mut gate = ApprovalGate::new(client, "job-1");

        let waiting: overseer_core::Job =
            serde_json::from_value(job_body("waiting_for_user", 0)).unwrap();
        gate.observe(&waiting, None);
        gate.set_feedback("use last quarter instead");

        let resumed = gate.submit(Decision::Reject).await.unwrap();
        assert_eq!(resumed.status, JobStatus::Running);
        assert!(!gate.is_awaiting_decision());
        assert!(gate.feedback().is_empty());
    }

    #[tokio::test]
    async fn resume_on_non_waiting_job_surfaces_server_detail() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/resume"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"detail": "Job is not waiting for user input"})),
            )
            .mount(&server)
            .await;

        let client = JobClient::new(server.uri());
        let err = client.resume("job-1", true, "").await.unwrap_err();
        assert!(matches!(err, OverseerError::InvalidState(_)));
        assert!(err.to_string().contains("not waiting for user input"));
    }
}

mod polling {
    use super::*;

    #[tokio::test]
    async fn watch_twice_shares_one_poll_loop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_body("running", 0)))
            .mount(&server)
            .await;

        let client = Arc::new(JobClient::new(server.uri()));
        let registry = Arc::new(RunRegistry::new());
        let poller = PollingController::new(client, registry.clone(), POLL_INTERVAL);
        let run_id = registry.record_start("wf-1", "orchestrator");

        let first = poller.watch("job-1", run_id);
        let second = poller.watch("job-1", run_id);

        let mut snapshots = second.snapshots();
        wait_for_status(&mut snapshots, JobStatus::Running).await;
        assert!(first.latest().is_some());

        poller.stop("job-1");
        wait_until_stopped(&poller, "job-1").await;
        // Stopping again is safe after self-cleanup.
        poller.stop("job-1");
    }

    #[tokio::test]
    async fn failed_ticks_keep_polling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/job-1"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jobs/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_body("completed", 1)))
            .mount(&server)
            .await;

        let client = Arc::new(JobClient::new(server.uri()));
        let registry = Arc::new(RunRegistry::new());
        let poller = PollingController::new(client, registry.clone(), POLL_INTERVAL);
        let run_id = registry.record_start("wf-1", "orchestrator");

        let handle = poller.watch("job-1", run_id);
        let mut snapshots = handle.snapshots();
        wait_for_status(&mut snapshots, JobStatus::Completed).await;
        wait_until_stopped(&poller, "job-1").await;
        assert_eq!(registry.get(run_id).unwrap().status, RunStatus::Succeeded);
    }
}

mod start_guard {
    use super::*;

    #[tokio::test]
    async fn second_start_for_same_workflow_conflicts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_body("running", 0)))
            .expect(1)
            .mount(&server)
            .await;

        let client = JobClient::new(server.uri());
        let job = client.start("wf-1", json!({})).await.unwrap();
        assert_eq!(client.active_job("wf-1").as_deref(), Some(job.id.as_str()));

        let err = client.start("wf-1", json!({})).await.unwrap_err();
        assert!(matches!(err, OverseerError::Conflict(_)));

        // Releasing the workflow allows a fresh session to start again.
        client.release_workflow("wf-1");
        assert!(client.active_job("wf-1").is_none());
    }
}

use overseer_core::{
    stream_for_config, EventEnvelope, EventKind, EventSource, EventStream, EventsConfig,
    JobClient, RunRegistry, RunStatus, SimulatedEventStream,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

async fn next(rx: &mut broadcast::Receiver<EventEnvelope>) -> EventEnvelope {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for envelope")
        .expect("stream closed unexpectedly")
}

fn simulated_stream() -> Arc<dyn EventStream> {
    let config = EventsConfig {
        source: EventSource::Simulated,
        sim_step_delay_ms: 0,
    };
    let client = Arc::new(JobClient::new("http://127.0.0.1:9"));
    stream_for_config(&config, client, None).unwrap()
}

mod approved_run {
    use super::*;

    #[tokio::test]
    async fn registry_follows_the_full_event_sequence() {
        let stream = simulated_stream();
        let registry = RunRegistry::new();
        let run_id = registry.record_start("Simulated analysis", "simulator");

        let mut rx = stream.subscribe();
        stream.start();

        // plan, sql: progress events leave the record running.
        registry.apply_event(run_id, &next(&mut rx).await);
        registry.apply_event(run_id, &next(&mut rx).await);
        assert_eq!(registry.get(run_id).unwrap().status, RunStatus::Running);

        let request = next(&mut rx).await;
        assert_eq!(request.kind, EventKind::ApprovalRequest);
        registry.apply_event(run_id, &request);
        assert_eq!(
            registry.get(run_id).unwrap().status,
            RunStatus::AwaitingApproval
        );

        stream.approve(Some("go ahead".to_string())).await.unwrap();

        let decision = next(&mut rx).await;
        assert_eq!(decision.kind, EventKind::ApprovalDecision);
        registry.apply_event(run_id, &decision);
        assert_eq!(registry.get(run_id).unwrap().status, RunStatus::Running);

        // rag, reasoning, response, then the terminal status.
        for expected in [EventKind::Rag, EventKind::Reasoning, EventKind::Response] {
            let envelope = next(&mut rx).await;
            assert_eq!(envelope.kind, expected);
            registry.apply_event(run_id, &envelope);
        }

        let terminal = next(&mut rx).await;
        assert_eq!(terminal.terminal_status(), Some("completed"));
        registry.apply_event(run_id, &terminal);
        assert_eq!(registry.get(run_id).unwrap().status, RunStatus::Succeeded);

        stream.stop();
    }

    #[tokio::test]
    async fn late_subscriber_with_early_registration_sees_everything() {
        let stream = SimulatedEventStream::new(Duration::ZERO);
        let mut early = stream.subscribe();
        let mut second = stream.subscribe();
        stream.start();

        // Both receivers observe the same prefix in the same order.
        for _ in 0..3 {
            let a = next(&mut early).await;
            let b = next(&mut second).await;
            assert_eq!(a.id, b.id);
            assert_eq!(a.kind, b.kind);
        }
    }
}

mod rejected_run {
    use super::*;

    #[tokio::test]
    async fn rejection_fails_the_record_and_ends_the_stream() {
        let stream = simulated_stream();
        let registry = RunRegistry::new();
        let run_id = registry.record_start("Simulated analysis", "simulator");

        let mut rx = stream.subscribe();
        stream.start();

        for _ in 0..3 {
            registry.apply_event(run_id, &next(&mut rx).await);
        }
        assert_eq!(
            registry.get(run_id).unwrap().status,
            RunStatus::AwaitingApproval
        );

        stream.reject(Some("wrong dataset".to_string())).await.unwrap();

        let terminal = next(&mut rx).await;
        assert_eq!(terminal.terminal_status(), Some("failed"));
        registry.apply_event(run_id, &terminal);
        assert_eq!(registry.get(run_id).unwrap().status, RunStatus::Failed);

        // Nothing follows the terminal status.
        let silence = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(silence.is_err());

        // And the failed record is immutable afterwards.
        registry.apply_event(
            run_id,
            &EventEnvelope::new(EventKind::ApprovalDecision, "late"),
        );
        assert_eq!(registry.get(run_id).unwrap().status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn decision_before_any_request_is_ignored() {
        let stream = simulated_stream();
        let mut rx = stream.subscribe();

        stream.approve(None).await.unwrap();
        stream.reject(None).await.unwrap();

        let silence = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(silence.is_err());
    }
}

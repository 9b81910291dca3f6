use colored::{ColoredString, Colorize};
use overseer_core::{
    stream_for_config, EventEnvelope, EventKind, EventSource, EventStream, EventsConfig,
    RunRegistry,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::context::{build_client, colorize_run_status, load_config, read_line};

pub async fn cmd_simulate(delay_ms: u64, yes: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = build_client(&config)?;
    let events_config = EventsConfig {
        source: EventSource::Simulated,
        sim_step_delay_ms: delay_ms,
    };

    let registry = Arc::new(RunRegistry::new());
    let run_id = registry.record_start("Simulated analysis", "simulator");

    let stream = stream_for_config(&events_config, client, None)?;
    let mut rx = stream.subscribe();
    stream.start();

    println!("{}", "Replaying simulated run...".cyan().bold());
    println!();

    loop {
        let envelope = match rx.recv().await {
            Ok(envelope) => envelope,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        };

        registry.apply_event(run_id, &envelope);
        print_envelope(&envelope);

        match envelope.kind {
            EventKind::ApprovalRequest => {
                let approved = if yes {
                    println!("    {} auto-approving (--yes)", "→".blue());
                    true
                } else {
                    matches!(
                        read_line("    approve? [y/n]:")?.to_lowercase().as_str(),
                        "y" | "yes"
                    )
                };
                if approved {
                    stream.approve(None).await?;
                } else {
                    let reason = read_line("    reason (optional):")?;
                    let reason = if reason.is_empty() { None } else { Some(reason) };
                    stream.reject(reason).await?;
                }
            }
            EventKind::Status if envelope.terminal_status().is_some() => break,
            _ => {}
        }
    }

    stream.stop();

    if let Some(record) = registry.get(run_id) {
        println!();
        println!(
            "  {} {} ({})",
            "Run:".dimmed(),
            record.workflow_name,
            colorize_run_status(record.status)
        );
    }
    println!();
    crate::commands::history::print_history(&registry);

    Ok(())
}

fn print_envelope(envelope: &EventEnvelope) {
    println!(
        "  {} [{:>17}] {}",
        envelope.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
        colorize_kind(envelope.kind),
        envelope.message
    );
}

fn colorize_kind(kind: EventKind) -> ColoredString {
    match kind {
        EventKind::Plan => "plan".magenta(),
        EventKind::Sql => "sql".blue(),
        EventKind::Rag => "rag".cyan(),
        EventKind::Reasoning => "reasoning".yellow(),
        EventKind::Response => "response".green(),
        EventKind::ApprovalRequest => "approval-request".yellow().bold(),
        EventKind::ApprovalDecision => "approval-decision".green().bold(),
        EventKind::Status => "status".bold(),
    }
}

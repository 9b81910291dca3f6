use anyhow::{bail, Context};
use colored::Colorize;
use overseer_core::{
    parse_question, ApprovalGate, Decision, GatePrompt, GateState, Job, PollingController,
    RunRegistry,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Duration;

use crate::context::{build_client, colorize_job_status, load_config, read_line};

pub async fn cmd_run(workflow_id: &str, input: &str, yes: bool) -> anyhow::Result<()> {
    let input_data = parse_input_json(input)?;

    let config = load_config()?;
    let client = build_client(&config)?;
    let registry = Arc::new(RunRegistry::new());
    let poller = PollingController::new(
        client.clone(),
        registry.clone(),
        Duration::from_millis(config.polling.interval_ms),
    );

    println!(
        "{} workflow {}",
        "Launching".cyan().bold(),
        workflow_id.bold()
    );

    let job = client.start(workflow_id, input_data).await?;
    let run_id = registry.record_start(workflow_id, "orchestrator");

    println!("  {} job {}", "→".blue(), job.id.bold());
    println!();

    let handle = poller.watch(&job.id, run_id);
    let mut gate = ApprovalGate::new(client.clone(), &job.id);
    let mut snapshots = handle.snapshots();
    let mut last_printed: Option<(overseer_core::JobStatus, usize)> = None;

    while snapshots.changed().await.is_ok() {
        let snapshot = match snapshots.borrow_and_update().clone() {
            Some(job) => job,
            None => continue,
        };

        let line_key = (snapshot.status, snapshot.current_step_index);
        if last_printed != Some(line_key) {
            println!(
                "  [{}] step {}",
                colorize_job_status(snapshot.status),
                snapshot.current_step_index
            );
            last_printed = Some(line_key);
        }

        let prompt = if snapshot.is_waiting_for_user() {
            prompt_from_snapshot(&snapshot)
        } else {
            None
        };
        gate.observe(&snapshot, prompt);

        if gate.is_awaiting_decision() {
            answer_gate(&mut gate, yes).await?;
            continue;
        }

        if snapshot.is_terminal() {
            print_outcome(&snapshot);
            break;
        }
    }

    println!();
    crate::commands::history::print_history(&registry);

    Ok(())
}

async fn answer_gate(gate: &mut ApprovalGate, yes: bool) -> anyhow::Result<()> {
    if let GateState::AwaitingDecision {
        prompt: Some(prompt),
        ..
    } = gate.state()
    {
        println!();
        println!("  {} {}", "?".yellow().bold(), prompt.question.bold());
        if !prompt.options.is_empty() {
            println!("    options: {}", prompt.options.join(", ").dimmed());
        }
    } else {
        println!();
        println!(
            "  {} {}",
            "?".yellow().bold(),
            "Job is waiting for your decision".bold()
        );
    }

    let decision = if yes {
        println!("    {} auto-approving (--yes)", "→".blue());
        Decision::Approve
    } else {
        loop {
            let answer = read_line("    approve? [y/n]:")?;
            match answer.to_lowercase().as_str() {
                "y" | "yes" => break Decision::Approve,
                "n" | "no" => {
                    let feedback = read_line("    feedback (optional):")?;
                    gate.set_feedback(feedback);
                    break Decision::Reject;
                }
                _ => println!("    {} answer y or n", "!".yellow()),
            }
        }
    };

    match gate.submit(decision).await {
        Ok(job) => {
            println!(
                "    {} resumed as {}",
                "✓".green(),
                colorize_job_status(job.status)
            );
            Ok(())
        }
        // Feedback survives a failed submit; surface the error and let the
        // poll loop bring the gate back around.
        Err(e) => {
            println!("    {} resume failed: {}", "✗".red(), e);
            Ok(())
        }
    }
}

fn print_outcome(job: &Job) {
    println!();
    match job.status {
        overseer_core::JobStatus::Completed => {
            println!(
                "{} {}",
                "✓".green().bold(),
                "Workflow completed".green()
            );
        }
        _ => {
            println!("{} {}", "✗".red().bold(), "Workflow failed".red());
            if let Some(error) = &job.error {
                println!("  {} {}", "reason:".dimmed(), error);
            }
        }
    }

    if !job.logs.is_empty() {
        println!();
        println!("  {}", "Recent log lines".yellow().bold());
        for line in job.logs.iter().rev().take(5).rev() {
            println!("    {}", line.dimmed());
        }
    }
}

/// Question carried in the paused snapshot's outputs, when one exists.
/// The run flow has no workflow definition to name the current step, so
/// every produced output is checked for the question pseudo-protocol;
/// `pending_tool_call` remains the gate's own fallback.
pub(crate) fn prompt_from_snapshot(job: &Job) -> Option<GatePrompt> {
    job.step_outputs
        .values()
        .chain(job.context.values())
        .filter_map(|value| value.as_str())
        .find_map(parse_question)
        .map(|parsed| GatePrompt {
            question: parsed.question,
            options: parsed.options,
        })
}

pub(crate) fn parse_input_json(input: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(input).context("--input must be valid JSON")?;
    if !value.is_object() && !value.is_null() {
        bail!("--input must be a JSON object");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_json_accepts_object() {
        assert!(parse_input_json(r#"{"dataset": "sales"}"#).is_ok());
        assert!(parse_input_json("{}").is_ok());
    }

    #[test]
    fn test_parse_input_json_rejects_non_object() {
        assert!(parse_input_json("[1, 2]").is_err());
        assert!(parse_input_json("not json").is_err());
    }

    #[test]
    fn test_prompt_from_snapshot_surfaces_question_options() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": "job-1",
            "workflow_id": "wf-1",
            "status": "waiting_for_user",
            "current_step_index": 0,
            "step_outputs": {
                "Step A": "QUESTION: Proceed? Available options: [yes, no]"
            }
        }))
        .unwrap();

        let prompt = prompt_from_snapshot(&job).unwrap();
        assert_eq!(prompt.question, "Proceed?");
        assert_eq!(prompt.options, vec!["yes".to_string(), "no".to_string()]);
    }

    #[test]
    fn test_prompt_from_snapshot_none_without_question() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": "job-1",
            "workflow_id": "wf-1",
            "status": "waiting_for_user",
            "current_step_index": 0,
            "step_outputs": {"Step A": "plain result text"},
            "context": {"rows": "42"}
        }))
        .unwrap();

        assert!(prompt_from_snapshot(&job).is_none());
    }

    #[test]
    fn test_prompt_from_snapshot_falls_back_to_context() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": "job-1",
            "workflow_id": "wf-1",
            "status": "waiting_for_user",
            "current_step_index": 0,
            "context": {
                "gate": "QUESTION: Ship it? Available options: [yes, no]"
            }
        }))
        .unwrap();

        let prompt = prompt_from_snapshot(&job).unwrap();
        assert_eq!(prompt.question, "Ship it?");
    }
}

use colored::Colorize;
use overseer_core::Job;

use crate::context::{build_client, colorize_job_status, load_config};

pub async fn cmd_status(job_id: &str, format: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = build_client(&config)?;
    let job = client.get_status(job_id).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    print_job(&job);
    Ok(())
}

fn print_job(job: &Job) {
    println!("{}", "Job Status".cyan().bold());
    println!("{}", "═".repeat(40).dimmed());
    println!();
    println!("  {:<15} {}", "Job:".bold(), job.id);
    println!("  {:<15} {}", "Workflow:".bold(), job.workflow_id);
    println!(
        "  {:<15} {}",
        "Status:".bold(),
        colorize_job_status(job.status)
    );
    println!("  {:<15} {}", "Current step:".bold(), job.current_step_index);

    if let Some(error) = &job.error {
        println!("  {:<15} {}", "Error:".bold(), error.red());
    }

    if let Some(pending) = &job.pending_tool_call {
        if let Some(prompt) = pending.prompt.as_deref().or(pending.tool_name.as_deref()) {
            println!();
            println!("  {} {}", "?".yellow().bold(), prompt.bold());
        }
    }

    if !job.step_outputs.is_empty() {
        println!();
        println!("  {}", "Step outputs".yellow().bold());
        let mut names: Vec<_> = job.step_outputs.keys().collect();
        names.sort();
        for name in names {
            println!("    {}", name);
        }
    }

    if !job.logs.is_empty() {
        println!();
        println!("  {}", "Recent log lines".yellow().bold());
        for line in job.logs.iter().rev().take(10).rev() {
            println!("    {}", line.dimmed());
        }
    }
}

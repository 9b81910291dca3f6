use anyhow::bail;
use colored::Colorize;
use overseer_core::{ApprovalGate, Decision};

use crate::context::{build_client, colorize_job_status, load_config};

pub async fn cmd_resume(
    job_id: &str,
    approve: bool,
    reject: bool,
    feedback: Option<&str>,
) -> anyhow::Result<()> {
    let decision = match (approve, reject) {
        (true, false) => Decision::Approve,
        (false, true) => Decision::Reject,
        _ => bail!("pass exactly one of --approve or --reject"),
    };

    let config = load_config()?;
    let client = build_client(&config)?;

    let job = client.get_status(job_id).await?;
    let mut gate = ApprovalGate::new(client.clone(), job_id);
    gate.observe(&job, None);

    if !gate.is_awaiting_decision() {
        bail!(
            "job {} is not waiting for input (status: {})",
            job_id,
            job.status
        );
    }

    if let Some(text) = feedback {
        gate.set_feedback(text);
    }

    let job = gate.submit(decision).await?;
    println!(
        "{} job {} resumed as {}",
        "✓".green().bold(),
        job_id.bold(),
        colorize_job_status(job.status)
    );

    Ok(())
}

use anyhow::Context;
use colored::{ColoredString, Colorize};
use overseer_core::{get_config_dir, JobClient, JobStatus, OverseerConfig, RunStatus};
use std::sync::Arc;

/// Load layered configuration after sourcing any `.env` files the operator
/// keeps around.
pub fn load_config() -> anyhow::Result<OverseerConfig> {
    load_dotenv_files();
    OverseerConfig::load().context("failed to load configuration")
}

pub fn build_client(config: &OverseerConfig) -> anyhow::Result<Arc<JobClient>> {
    let client = JobClient::from_config(&config.orchestrator)
        .context("failed to build orchestrator client")?;
    Ok(Arc::new(client))
}

fn load_dotenv_files() {
    let current_dir = std::env::current_dir().ok();

    let env_paths = [
        current_dir.as_ref().map(|d| d.join(".env")),
        current_dir.as_ref().map(|d| d.join(".env.local")),
        dirs::home_dir().map(|d| d.join(".overseer").join(".env")),
        get_config_dir().map(|d| d.join(".env")),
    ];

    for path in env_paths.iter().flatten() {
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

pub fn colorize_job_status(status: JobStatus) -> ColoredString {
    match status {
        JobStatus::Running => "running".cyan(),
        JobStatus::WaitingForUser => "waiting_for_user".yellow(),
        JobStatus::Completed => "completed".green(),
        JobStatus::Failed => "failed".red(),
    }
}

pub fn colorize_run_status(status: RunStatus) -> ColoredString {
    match status {
        RunStatus::Running => "running".cyan(),
        RunStatus::AwaitingApproval => "awaiting-approval".yellow(),
        RunStatus::Succeeded => "succeeded".green(),
        RunStatus::Failed => "failed".red(),
    }
}

/// Block on one line of operator input. The CLI is single-threaded at the
/// prompt, so a plain blocking read is fine here.
pub fn read_line(prompt: &str) -> anyhow::Result<String> {
    use std::io::Write;

    print!("{} ", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

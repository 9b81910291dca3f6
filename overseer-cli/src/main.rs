use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod context;

use commands::{cmd_chat, cmd_history, cmd_plan, cmd_resume, cmd_run, cmd_simulate, cmd_status};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "overseer")]
#[command(version = VERSION)]
#[command(about = "Overseer - workflow job orchestration with human-in-the-loop approvals")]
#[command(long_about = r#"
Overseer launches analysis workflows on a remote orchestrator, follows their
progress, and pauses for operator approval when a job asks for one.

Use 'overseer run <workflow-id>' to launch and watch a job, 'overseer status'
to inspect one, and 'overseer simulate' to replay the local event generator
without a backend.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Launch a workflow job and follow it to completion")]
    Run {
        #[arg(help = "Workflow identifier known to the orchestrator")]
        workflow_id: String,

        #[arg(short, long, default_value = "{}", help = "Input data as JSON")]
        input: String,

        #[arg(short = 'y', long, help = "Approve pending decisions automatically")]
        yes: bool,
    },

    #[command(about = "Show the current snapshot of a job")]
    Status {
        #[arg(help = "Job identifier")]
        job_id: String,

        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Answer a pending approval for a waiting job")]
    Resume {
        #[arg(help = "Job identifier")]
        job_id: String,

        #[arg(long, conflicts_with = "reject", help = "Approve and continue")]
        approve: bool,

        #[arg(long, help = "Reject and stop")]
        reject: bool,

        #[arg(short, long, help = "Free-text feedback to carry with the decision")]
        feedback: Option<String>,
    },

    #[command(about = "Send a conversational message about a job")]
    Chat {
        #[arg(help = "Job identifier")]
        job_id: String,

        #[arg(help = "Message text")]
        message: String,
    },

    #[command(about = "Ask the orchestrator to draft a workflow plan")]
    Plan {
        #[arg(help = "Free-text description of the analysis to plan")]
        request: String,

        #[arg(short, long, help = "Data source to plan against (repeatable)")]
        data_source: Vec<String>,
    },

    #[command(about = "Replay the deterministic local event stream")]
    Simulate {
        #[arg(
            long,
            default_value = "400",
            help = "Delay between emitted events in milliseconds"
        )]
        delay_ms: u64,

        #[arg(short = 'y', long, help = "Approve the simulated gate automatically")]
        yes: bool,
    },

    #[command(about = "Show runs recorded in this session")]
    History,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run {
            workflow_id,
            input,
            yes,
        } => cmd_run(&workflow_id, &input, yes).await,
        Commands::Status { job_id, format } => cmd_status(&job_id, &format).await,
        Commands::Resume {
            job_id,
            approve,
            reject,
            feedback,
        } => cmd_resume(&job_id, approve, reject, feedback.as_deref()).await,
        Commands::Chat { job_id, message } => cmd_chat(&job_id, &message).await,
        Commands::Plan {
            request,
            data_source,
        } => cmd_plan(&request, data_source).await,
        Commands::Simulate { delay_ms, yes } => cmd_simulate(delay_ms, yes).await,
        Commands::History => cmd_history(),
    }
}

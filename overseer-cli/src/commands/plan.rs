use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Table};
use overseer_core::WorkflowDefinition;

use crate::context::{build_client, load_config};

pub async fn cmd_plan(request: &str, data_sources: Vec<String>) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = build_client(&config)?;

    let sources = if data_sources.is_empty() {
        None
    } else {
        Some(data_sources)
    };

    println!("{}", "Drafting workflow plan...".cyan().bold());
    let workflow = client.create_plan(request, sources).await?;
    println!();
    print_workflow(&workflow);

    Ok(())
}

fn print_workflow(workflow: &WorkflowDefinition) {
    println!("  {} {}", "Workflow:".bold(), workflow.name.bold());
    if let Some(id) = workflow.id.as_deref() {
        println!("  {} {}", "Id:".bold(), id);
    }
    if let Some(description) = workflow.description.as_deref() {
        println!("  {} {}", "About:".bold(), description.dimmed());
    }
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["#", "Step", "Type", "Agent", "Approval"]);

    for (index, step) in workflow.steps.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index),
            Cell::new(&step.name),
            Cell::new(&step.step_type),
            Cell::new(step.agent.as_deref().unwrap_or("-")),
            Cell::new(if step.requires_approval { "yes" } else { "" }),
        ]);
    }

    println!("{}", table);
}

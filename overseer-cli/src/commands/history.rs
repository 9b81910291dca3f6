use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Table};
use overseer_core::RunRegistry;

pub fn cmd_history() -> anyhow::Result<()> {
    // The registry is session-local; a fresh invocation starts empty.
    let registry = RunRegistry::new();
    print_history(&registry);
    Ok(())
}

pub fn print_history(registry: &RunRegistry) {
    let runs = registry.runs();
    if runs.is_empty() {
        println!(
            "{}",
            "No runs recorded in this session. Run history is kept in memory only."
                .dimmed()
        );
        return;
    }

    println!("{}", "Run History".cyan().bold());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Started", "Workflow", "Engine", "Status"]);

    for run in runs {
        table.add_row(vec![
            Cell::new(run.started_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&run.workflow_name),
            Cell::new(&run.engine),
            Cell::new(run.status.to_string()),
        ]);
    }

    println!("{}", table);
}

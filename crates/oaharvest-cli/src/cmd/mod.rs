pub mod authors;
pub mod papers;

use std::path::PathBuf;
use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use oaharvest_core::{StopFlag, fmt_num};
use oaharvest_openalex::RunSummary;

use crate::config::Config;

/// Library run configuration: config file defaults, CLI overrides
fn run_config(
    config: &Config,
    output: Option<PathBuf>,
    workers: Option<usize>,
    limit: Option<usize>,
    stop: &StopFlag,
) -> oaharvest_openalex::Config {
    oaharvest_openalex::Config {
        output_dir: output.unwrap_or_else(|| config.output.default_dir.clone()),
        workers: config.workers.resolve(workers),
        base_url: config.openalex.base_url.clone(),
        mailto: config.openalex.mailto.clone(),
        timeout: Duration::from_secs(config.http.timeout_secs),
        max_tasks: limit,
        stop: StopFlag::clone(stop),
    }
}

/// Print a run summary table on stderr; errors if the run is incomplete
fn report(title: &str, summary: &RunSummary) -> anyhow::Result<()> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let rows = [
        (
            "Candidates",
            format!(
                "{} ({} done before, {} duplicate)",
                fmt_num(summary.candidates),
                fmt_num(summary.skipped),
                fmt_num(summary.duplicates)
            ),
        ),
        (
            "Tasks",
            format!(
                "{}/{} ({} remote failures)",
                fmt_num(summary.processed),
                fmt_num(summary.enqueued),
                fmt_num(summary.remote_failures)
            ),
        ),
        (
            "Records",
            format!(
                "{} written of {} matched",
                fmt_num(summary.written),
                fmt_num(summary.matched)
            ),
        ),
        ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    if summary.failed_workers > 0 {
        table.add_row(vec![
            Cell::new("Failed workers").fg(Color::Red),
            Cell::new(summary.failed_workers),
        ]);
    }
    if let Some(e) = &summary.writer_error {
        table.add_row(vec![Cell::new("Writer").fg(Color::Red), Cell::new(e)]);
    }
    eprintln!("\n{table}");

    if summary.interrupted {
        anyhow::bail!("Run stopped early; re-run the same command to resume");
    }
    if !summary.is_complete() {
        anyhow::bail!("Run incomplete; re-run the same command to resume");
    }
    Ok(())
}

//! `rblwatch history` - Past monitoring runs.

use anyhow::Result;
use colored::Colorize;
use rblwatch_core::{RunRecord, RunStatus};
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::HistoryArgs;
use crate::output::{print_csv, print_json, OutputFormat};

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Trigger")]
    trigger: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "Checks")]
    checks: usize,
    #[tabled(rename = "Listed")]
    listed: usize,
    #[tabled(rename = "Blocked")]
    blocked: usize,
    #[tabled(rename = "Errors")]
    errored: usize,
}

pub async fn execute(ctx: Context, args: HistoryArgs) -> Result<()> {
    let runs: Vec<RunRecord> = ctx
        .storage()?
        .load()
        .await?
        .runs
        .into_iter()
        .rev()
        .take(args.limit)
        .collect();

    match ctx.output_format {
        OutputFormat::Json => print_json(&runs)?,
        OutputFormat::Csv => print_csv(
            &["id", "trigger", "status", "started_at", "finished_at", "checks", "listed", "blocked", "errored", "error"],
            runs.iter().map(|r| {
                [
                    r.id.to_string(),
                    r.trigger.to_string(),
                    r.status.to_string(),
                    r.started_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                    r.finished_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                    r.counts.checks.to_string(),
                    r.counts.listed.to_string(),
                    r.counts.blocked.to_string(),
                    r.counts.errored.to_string(),
                    r.error.clone().unwrap_or_default(),
                ]
            }),
        )?,
        OutputFormat::Pretty => {
            if runs.is_empty() {
                println!("  No runs recorded yet.");
                println!();
                println!("  Start one with: {} run", "rblwatch".cyan());
                return Ok(());
            }
            let rows: Vec<RunRow> = runs
                .iter()
                .map(|r| RunRow {
                    id: r.id,
                    trigger: r.trigger.to_string(),
                    status: match r.status {
                        RunStatus::Completed => r.status.to_string().green().to_string(),
                        RunStatus::Failed => r.status.to_string().red().to_string(),
                        _ => r.status.to_string(),
                    },
                    started: r
                        .started_at
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default(),
                    checks: r.counts.checks,
                    listed: r.counts.listed,
                    blocked: r.counts.blocked,
                    errored: r.counts.errored,
                })
                .collect();
            println!("{}", Table::new(&rows).with(Style::rounded()).to_string());

            for run in runs.iter().filter(|r| r.error.is_some()) {
                println!(
                    "{} run {}: {}",
                    "Failed".red(),
                    run.id,
                    run.error.as_deref().unwrap_or_default().dimmed()
                );
            }
        }
    }
    Ok(())
}

//! `rblwatch status` - Last known status per (target, zone).

use anyhow::Result;
use colored::Colorize;
use rblwatch_core::ProbeStatus;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::StatusArgs;
use crate::output::{print_csv, print_json, OutputFormat};
use crate::state::PairStatus;

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last checked")]
    last_checked: String,
    #[tabled(rename = "Last listed")]
    last_seen: String,
}

pub async fn execute(ctx: Context, args: StatusArgs) -> Result<()> {
    let mut statuses: Vec<PairStatus> = ctx
        .storage()?
        .load()
        .await?
        .statuses
        .into_iter()
        .filter(|s| args.all || s.status.is_issue())
        .collect();
    statuses.sort_by(|a, b| (&a.target, &a.zone).cmp(&(&b.target, &b.zone)));

    match ctx.output_format {
        OutputFormat::Json => print_json(&statuses)?,
        OutputFormat::Csv => print_csv(
            &["target", "zone", "status", "addresses", "reason", "last_checked", "last_seen"],
            statuses.iter().map(|s| {
                [
                    s.target.clone(),
                    s.zone.clone(),
                    s.status.to_string(),
                    s.addresses.join(";"),
                    s.reason.clone().unwrap_or_default(),
                    s.last_checked.to_rfc3339(),
                    s.last_seen.map(|t| t.to_rfc3339()).unwrap_or_default(),
                ]
            }),
        )?,
        OutputFormat::Pretty => {
            if statuses.is_empty() {
                let what = if args.all { "No checks recorded yet." } else { "No listings." };
                println!("  {}", what.green());
                return Ok(());
            }
            let rows: Vec<StatusRow> = statuses
                .iter()
                .map(|s| StatusRow {
                    target: s.target.clone(),
                    zone: s.zone.clone(),
                    status: colored_status(s.status),
                    last_checked: s.last_checked.format("%Y-%m-%d %H:%M").to_string(),
                    last_seen: s
                        .last_seen
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default(),
                })
                .collect();
            println!("{}", Table::new(&rows).with(Style::rounded()).to_string());
        }
    }
    Ok(())
}

fn colored_status(status: ProbeStatus) -> String {
    match status {
        ProbeStatus::Listed => status.as_str().red().bold().to_string(),
        ProbeStatus::Blocked => status.as_str().yellow().to_string(),
        ProbeStatus::Error => status.as_str().dimmed().to_string(),
        ProbeStatus::NotListed => status.as_str().green().to_string(),
    }
}

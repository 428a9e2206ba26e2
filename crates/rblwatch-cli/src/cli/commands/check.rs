//! `rblwatch check` - Ad-hoc lookups against blacklist zones.

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rblwatch_core::{ProbeOutcome, Target, Zone};
use rblwatch_engine::{BatchReport, Storage, TargetReport};
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::CheckArgs;
use crate::output::{print_csv, print_json, OutputFormat};

#[derive(Tabled)]
struct HitRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Answer")]
    answer: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

pub async fn execute(ctx: Context, args: CheckArgs) -> Result<()> {
    let targets = args
        .targets
        .iter()
        .map(Target::new)
        .collect::<rblwatch_core::Result<Vec<_>>>()?;
    let zones = resolve_zones(&ctx, &args.zones).await?;
    let options = ctx.check_options(&args.overrides);
    let checker = ctx.checker()?;

    let spinner = (ctx.output_format == OutputFormat::Pretty).then(|| {
        spinner(format!(
            "Checking {} target(s) against {} zone(s)...",
            targets.len(),
            zones.len()
        ))
    });
    let report = checker.check_batch(&targets, &zones, options).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = report?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Csv => print_outcomes_csv(&report.outcomes)?,
        OutputFormat::Pretty => print_report(&report),
    }

    Ok(())
}

/// Zones from `--zone`, else the enabled zones in the state file, else the built-in catalog.
async fn resolve_zones(ctx: &Context, names: &[String]) -> Result<Vec<Zone>> {
    if !names.is_empty() {
        return Ok(names
            .iter()
            .map(Zone::new)
            .collect::<rblwatch_core::Result<Vec<_>>>()?);
    }
    let configured = ctx.storage()?.load_enabled_zones().await?;
    if configured.is_empty() {
        Ok(Zone::defaults())
    } else {
        Ok(configured)
    }
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub(crate) fn print_outcomes_csv(outcomes: &[ProbeOutcome]) -> Result<()> {
    print_csv(
        &["target", "zone", "status", "addresses", "txt", "reason"],
        outcomes.iter().map(|o| {
            [
                o.target.clone(),
                o.zone.clone(),
                o.status.to_string(),
                o.addresses.join(";"),
                o.txt.as_ref().map(|t| t.join(";")).unwrap_or_default(),
                o.reason.clone().unwrap_or_default(),
            ]
        }),
    )
}

pub(crate) fn print_report(report: &BatchReport) {
    for target in &report.results {
        print_target(target);
    }

    let summary = &report.summary;
    println!(
        "{} {} target(s): {} listed, {} blocked, {} with errors",
        "Summary:".bold(),
        summary.total_targets,
        summary.listed_targets.to_string().red().bold(),
        summary.blocked_targets.to_string().yellow(),
        summary.error_targets
    );
}

fn print_target(target: &TargetReport) {
    let badge = if target.is_listed() {
        "LISTED".red().bold()
    } else {
        "CLEAN".green().bold()
    };
    println!("{} {} ({}) [{}]", "Target:".bold(), target.target.cyan(), target.kind, badge);
    println!(
        "  {} zone(s) checked, {} not listed",
        target.zone_count(),
        target.not_listed_count
    );

    if !target.listed.is_empty() {
        let rows: Vec<HitRow> = target
            .listed
            .iter()
            .map(|hit| HitRow {
                zone: hit.zone.clone(),
                answer: hit.addresses.join(", "),
                reason: hit
                    .txt
                    .as_ref()
                    .map(|t| t.join(" ").chars().take(60).collect())
                    .unwrap_or_default(),
            })
            .collect();
        println!("{}", Table::new(&rows).with(Style::rounded()).to_string());
    }

    for blocked in &target.blocked {
        println!("  {} {}: {}", "blocked".yellow(), blocked.zone, blocked.reason.dimmed());
    }
    for error in &target.errors {
        println!("  {} {}: {}", "error".dimmed(), error.zone, error.reason.dimmed());
    }
    println!();
}

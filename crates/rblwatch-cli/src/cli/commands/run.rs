//! `rblwatch run` / `rblwatch watch` - Monitoring passes over the watch list.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use rblwatch_core::{AlertKind, RunStatus};
use rblwatch_engine::{EngineMetrics, Monitor, RunReport, RunRequest};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::Context;
use crate::cli::args::{RunArgs, WatchArgs};
use crate::output::{print_json, OutputFormat};

pub async fn execute(ctx: Context, args: RunArgs) -> Result<()> {
    let storage = Arc::new(ctx.storage()?);
    let monitor = ctx.monitor(storage, Arc::new(EngineMetrics::new())).await?;

    let mut request = RunRequest::manual().with_options(ctx.check_options(&args.overrides));
    if !args.targets.is_empty() {
        request = request.with_targets(args.targets);
    }
    if !args.zones.is_empty() {
        request = request.with_zones(args.zones);
    }

    let outcome = monitor.run_once(request).await;
    print_run(&ctx, &outcome)?;

    if outcome.record.status == RunStatus::Failed {
        anyhow::bail!(
            "run {} failed: {}",
            outcome.record.id,
            outcome.record.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

pub async fn watch(ctx: Context, args: WatchArgs) -> Result<()> {
    let interval = watch_interval(args.interval_minutes, ctx.config.schedule_interval())?;

    let storage = Arc::new(ctx.storage()?);
    let metrics = Arc::new(EngineMetrics::new());
    let monitor = ctx.monitor(storage, Arc::clone(&metrics)).await?;

    info!(interval_secs = interval.as_secs(), "watching");
    run_scheduled(&monitor, interval, args.max_runs, interrupted(), |outcome| {
        if outcome.record.status == RunStatus::Failed {
            warn!(run_id = outcome.record.id, "scheduled run failed");
        }
        print_run(&ctx, outcome)
    })
    .await?;

    let snapshot = metrics.snapshot();
    info!(
        runs = snapshot.runs_observed,
        checks = snapshot.checks_total,
        listed = snapshot.checks_listed,
        "watch stopped"
    );
    if ctx.verbose && ctx.output_format == OutputFormat::Pretty {
        println!("{}", serde_json::to_string_pretty(&snapshot)?.dimmed());
    }
    Ok(())
}

/// `--interval-minutes` as a duration, else the configured schedule.
fn watch_interval(minutes: Option<u64>, default: Duration) -> Result<Duration> {
    match minutes {
        None => Ok(default),
        Some(0) => anyhow::bail!("--interval-minutes must be positive"),
        Some(minutes) => minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| anyhow::anyhow!("--interval-minutes is too large")),
    }
}

/// Resolves on the first Ctrl-C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Scheduled runs every `interval` until `shutdown` resolves or `max_runs`
/// runs have finished. A run still in progress at shutdown is abandoned.
/// Returns the number of finished runs.
async fn run_scheduled<F, R>(
    monitor: &Monitor,
    interval: Duration,
    max_runs: Option<u64>,
    shutdown: F,
    mut on_run: R,
) -> Result<u64>
where
    F: Future<Output = ()>,
    R: FnMut(&RunReport) -> Result<()>,
{
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut completed_runs = 0u64;
    while max_runs.map_or(true, |max| completed_runs < max) {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!("interrupted");
                break;
            }
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            () = &mut shutdown => {
                info!("interrupted during a run");
                break;
            }
            outcome = monitor.run_once(RunRequest::scheduled()) => outcome,
        };
        on_run(&outcome)?;
        completed_runs += 1;
    }
    Ok(completed_runs)
}

fn print_run(ctx: &Context, outcome: &RunReport) -> Result<()> {
    match ctx.output_format {
        OutputFormat::Json => print_json(outcome)?,
        OutputFormat::Csv => {
            let outcomes = outcome.report.as_ref().map_or(&[][..], |r| r.outcomes.as_slice());
            super::check::print_outcomes_csv(outcomes)?;
        }
        OutputFormat::Pretty => print_run_pretty(outcome),
    }
    Ok(())
}

fn print_run_pretty(outcome: &RunReport) {
    let record = &outcome.record;
    let status = match record.status {
        RunStatus::Completed => "completed".green().bold(),
        RunStatus::Failed => "failed".red().bold(),
        other => other.to_string().normal(),
    };
    println!("{} #{} ({}) {}", "Run".bold(), record.id, record.trigger, status);

    if let Some(error) = &record.error {
        println!("  {} {}", "Error:".bold(), error.red());
        return;
    }

    let counts = &record.counts;
    println!(
        "  {} target(s) x {} zone(s) = {} check(s)",
        counts.targets, counts.zones, counts.checks
    );
    println!(
        "  {} listed, {} blocked, {} errors",
        counts.listed.to_string().red().bold(),
        counts.blocked.to_string().yellow(),
        counts.errored
    );
    if let Some(secs) = record.duration_secs() {
        println!("  {} {secs:.2}s", "Duration:".bold());
    }

    if outcome.alerts.is_empty() {
        println!("  {}", "No status changes.".dimmed());
        return;
    }
    println!();
    println!("{}", "Alerts:".bold().underline());
    for alert in &outcome.alerts {
        let kind = match alert.kind {
            AlertKind::Listed => alert.kind.to_string().red().bold(),
            AlertKind::Blocked => alert.kind.to_string().yellow().bold(),
            _ => alert.kind.to_string().green().bold(),
        };
        println!("  [{kind}] {}", alert.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rblwatch_engine::{BatchChecker, EngineConfig, MemoryStorage, ZoneProber};

    fn monitor() -> Monitor {
        let mut config = EngineConfig::default();
        config.dns.nameservers = vec!["127.0.0.1".into()];
        let checker = BatchChecker::new(ZoneProber::from_config(&config).unwrap());
        Monitor::new(checker, Arc::new(MemoryStorage::new(Vec::new(), Vec::new())))
    }

    #[test]
    fn test_watch_interval() {
        let default = Duration::from_secs(1800);
        assert_eq!(watch_interval(None, default).unwrap(), default);
        assert_eq!(watch_interval(Some(5), default).unwrap(), Duration::from_secs(300));
        assert!(watch_interval(Some(0), default).is_err());
        assert!(watch_interval(Some(u64::MAX), default).is_err());
    }

    #[tokio::test]
    async fn test_scheduled_runs_stop_at_max() {
        let mut ids = Vec::new();
        let runs = run_scheduled(
            &monitor(),
            Duration::from_millis(5),
            Some(3),
            std::future::pending(),
            |outcome| {
                ids.push(outcome.record.id);
                Ok(())
            },
        )
        .await
        .unwrap();
        assert_eq!(runs, 3);
        assert_eq!(ids, [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_shutdown_stops_before_next_run() {
        let runs = run_scheduled(&monitor(), Duration::from_millis(5), None, async {}, |_| Ok(()))
            .await
            .unwrap();
        assert_eq!(runs, 0);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_long_schedule() {
        let shutdown = tokio::time::sleep(Duration::from_millis(50));
        let runs = tokio::time::timeout(
            Duration::from_secs(5),
            run_scheduled(&monitor(), Duration::from_secs(3600), None, shutdown, |_| Ok(())),
        )
        .await
        .expect("shutdown was not observed")
        .unwrap();
        assert_eq!(runs, 1);
    }
}

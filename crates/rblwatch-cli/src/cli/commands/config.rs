//! `rblwatch config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::{print_json, OutputFormat};

pub async fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Path => show_path(&ctx),
        ConfigCommands::Init { force } => init_config(&ctx, force),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    match ctx.output_format {
        OutputFormat::Json => print_json(config)?,
        _ => {
            println!("{}", "Current Configuration:".bold());
            println!();

            let state = config.state_path()?;
            println!("  {} {}", "state_path:".bold(), state.display());
            println!(
                "  {} {}",
                "webhook_url:".bold(),
                config
                    .webhook_url
                    .clone()
                    .unwrap_or_else(|| "(not set, alerts are logged)".dimmed().to_string())
            );
            println!("  {} {}s", "webhook_timeout:".bold(), config.webhook_timeout_secs);
            println!("  {} {} min", "schedule_interval:".bold(), config.schedule_interval_minutes);
            println!("  {} {:?}", "log_format:".bold(), config.log_format);

            let dns = &config.engine.dns;
            println!();
            println!("{}", "DNS:".bold().underline());
            println!("  {} {} ms", "timeout:".bold(), dns.timeout_ms);
            println!("  {} {}", "attempts:".bold(), dns.attempts);
            println!("  {} {}", "concurrency:".bold(), dns.concurrency);
            println!("  {} {} q/s", "per_zone_rate:".bold(), dns.per_zone_rate);
            let servers = if dns.nameservers.is_empty() {
                "(system resolver)".dimmed().to_string()
            } else {
                dns.nameservers.join(", ")
            };
            println!("  {} {servers}", "nameservers:".bold());
            for (zone, rate) in &dns.zone_rates {
                println!("  {} {zone} = {rate} q/s", "zone_rate:".bold());
            }

            let cache = &config.engine.cache;
            println!();
            println!("{}", "Cache:".bold().underline());
            println!("  {} {}s", "ttl:".bold(), cache.ttl_secs);
            println!("  {} {}", "max_size:".bold(), cache.max_size);
            if let Some(secs) = cache.error_ttl_secs {
                println!("  {} {secs}s", "error_ttl:".bold());
            }
        }
    }

    Ok(())
}

fn show_path(ctx: &Context) -> Result<()> {
    println!("{}", ctx.config_path.display());
    Ok(())
}

fn init_config(ctx: &Context, force: bool) -> Result<()> {
    let path = &ctx.config_path;
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists\n\nUse --force to overwrite it.",
            path.display()
        );
    }
    Config::default().save(path)?;
    println!("{} Wrote {}", "Success:".green().bold(), path.display().to_string().cyan());
    Ok(())
}

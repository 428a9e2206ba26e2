//! `rblwatch zones` - Blacklist zone management.

use anyhow::Result;
use colored::Colorize;
use rblwatch_core::Zone;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::{ZonesArgs, ZonesCommands};
use crate::output::{print_csv, print_json, OutputFormat};

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    name: String,
    #[tabled(rename = "Spamhaus")]
    spamhaus: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Rate (q/s)")]
    rate: u32,
}

pub async fn execute(ctx: Context, args: ZonesArgs) -> Result<()> {
    match args.command {
        ZonesCommands::Add { name, spamhaus } => add_zone(ctx, &name, spamhaus).await,
        ZonesCommands::List => list_zones(ctx).await,
        ZonesCommands::Remove { name } => remove_zone(ctx, &name).await,
        ZonesCommands::Defaults => install_defaults(ctx).await,
    }
}

async fn add_zone(ctx: Context, name: &str, spamhaus: bool) -> Result<()> {
    let mut zone = Zone::new(name)?;
    if spamhaus {
        zone = zone.spamhaus(true);
    }
    let added = ctx.storage()?.add_zones(vec![zone.clone()]).await?;
    if added == 0 {
        anyhow::bail!("zone '{}' already exists", zone.name);
    }
    println!("{} Added zone {}", "Success:".green().bold(), zone.name.cyan());
    Ok(())
}

async fn list_zones(ctx: Context) -> Result<()> {
    let zones = ctx.storage()?.load().await?.zones;
    let dns = &ctx.config.engine.dns;

    match ctx.output_format {
        OutputFormat::Json => print_json(&zones)?,
        OutputFormat::Csv => print_csv(
            &["zone", "spamhaus", "enabled", "rate"],
            zones.iter().map(|z| {
                [
                    z.name.clone(),
                    z.is_spamhaus.to_string(),
                    z.enabled.to_string(),
                    dns.rate_for(&z.name).to_string(),
                ]
            }),
        )?,
        OutputFormat::Pretty => {
            if zones.is_empty() {
                println!("  No zones configured; checks use the built-in catalog.");
                println!();
                println!("  Install it with: {} zones defaults", "rblwatch".cyan());
                return Ok(());
            }
            let rows: Vec<ZoneRow> = zones
                .iter()
                .map(|z| ZoneRow {
                    name: z.name.clone(),
                    spamhaus: if z.is_spamhaus { "yes".into() } else { String::new() },
                    enabled: if z.enabled { "yes".into() } else { "no".into() },
                    rate: dns.rate_for(&z.name),
                })
                .collect();
            println!("{}", Table::new(&rows).with(Style::rounded()).to_string());
            println!("{}", format!("{} zone(s)", zones.len()).dimmed());
        }
    }
    Ok(())
}

async fn remove_zone(ctx: Context, name: &str) -> Result<()> {
    let removed = ctx.storage()?.remove_zone(name).await?;
    println!("{} Removed zone {}", "Success:".green().bold(), removed.name.cyan());
    Ok(())
}

async fn install_defaults(ctx: Context) -> Result<()> {
    let catalog = Zone::defaults();
    let total = catalog.len();
    let added = ctx.storage()?.add_zones(catalog).await?;
    println!(
        "{} Installed {added} of {total} default zones ({} already present)",
        "Success:".green().bold(),
        total - added
    );
    Ok(())
}

//! `rblwatch targets` - Watch list management.

use anyhow::Result;
use colored::Colorize;
use rblwatch_core::Target;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::{TargetsArgs, TargetsCommands};
use crate::output::{print_csv, print_json, OutputFormat};

#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

pub async fn execute(ctx: Context, args: TargetsArgs) -> Result<()> {
    match args.command {
        TargetsCommands::Add { address, id, disabled } => add_target(ctx, address, id, disabled).await,
        TargetsCommands::List => list_targets(ctx).await,
        TargetsCommands::Remove { id } => remove_target(ctx, &id).await,
        TargetsCommands::Enable { id } => set_enabled(ctx, &id, true).await,
        TargetsCommands::Disable { id } => set_enabled(ctx, &id, false).await,
    }
}

async fn add_target(ctx: Context, address: String, id: Option<String>, disabled: bool) -> Result<()> {
    let target = match id {
        Some(id) => Target::with_id(id, address)?,
        None => Target::new(address)?,
    }
    .enabled(!disabled);

    ctx.storage()?.add_target(target.clone()).await?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&target)?,
        _ => println!(
            "{} Added {} {} ({})",
            "Success:".green().bold(),
            target.kind,
            target.address.cyan(),
            target.id
        ),
    }
    Ok(())
}

async fn list_targets(ctx: Context) -> Result<()> {
    let targets = ctx.storage()?.load().await?.targets;

    match ctx.output_format {
        OutputFormat::Json => print_json(&targets)?,
        OutputFormat::Csv => print_csv(
            &["id", "address", "kind", "enabled"],
            targets
                .iter()
                .map(|t| [t.id.clone(), t.address.clone(), t.kind.to_string(), t.enabled.to_string()]),
        )?,
        OutputFormat::Pretty => {
            if targets.is_empty() {
                println!("  No targets configured.");
                println!();
                println!("  Add one with: {} targets add <ADDRESS>", "rblwatch".cyan());
                return Ok(());
            }
            let rows: Vec<TargetRow> = targets
                .iter()
                .map(|t| TargetRow {
                    id: t.id.clone(),
                    address: t.address.clone(),
                    kind: t.kind.to_string(),
                    enabled: if t.enabled { "yes".into() } else { "no".into() },
                })
                .collect();
            println!("{}", Table::new(&rows).with(Style::rounded()).to_string());
        }
    }
    Ok(())
}

async fn remove_target(ctx: Context, id: &str) -> Result<()> {
    let removed = ctx.storage()?.remove_target(id).await?;
    if ctx.output_format == OutputFormat::Json {
        print_json(&removed)?;
    } else {
        println!("{} Removed {}", "Success:".green().bold(), removed.address.cyan());
    }
    Ok(())
}

async fn set_enabled(ctx: Context, id: &str, enabled: bool) -> Result<()> {
    ctx.storage()?.set_target_enabled(id, enabled).await?;
    let state = if enabled { "enabled" } else { "disabled" };
    println!("{} Target {} {state}", "Success:".green().bold(), id.cyan());
    Ok(())
}

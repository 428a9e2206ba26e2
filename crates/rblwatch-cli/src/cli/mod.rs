//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;

use crate::config::Config;
use crate::logging;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;

    logging::init(cli.verbose, config.log_format);

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Determine output format
    let output_format = cli.output.or(config.output_format).unwrap_or_default();

    // Create context for commands
    let ctx = commands::Context {
        config,
        config_path,
        output_format,
        verbose: cli.verbose,
        no_color: cli.no_color,
    };

    // Dispatch to appropriate command
    match cli.command {
        Commands::Check(args) => commands::check::execute(ctx, args).await,
        Commands::Run(args) => commands::run::execute(ctx, args).await,
        Commands::Watch(args) => commands::run::watch(ctx, args).await,
        Commands::Targets(args) => commands::targets::execute(ctx, args).await,
        Commands::Zones(args) => commands::zones::execute(ctx, args).await,
        Commands::Status(args) => commands::status::execute(ctx, args).await,
        Commands::History(args) => commands::history::execute(ctx, args).await,
        Commands::Config(args) => commands::config::execute(ctx, args).await,
    }
}

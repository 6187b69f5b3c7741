use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use fz_cli::commands::{config, exam, study};
use fz_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr; stdout belongs to the session screen
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let settings = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?settings, "loaded configuration");

    let mut stdout = std::io::stdout();
    match command {
        Commands::Study(args) => study::run(&mut stdout, &settings, args)?,
        Commands::Exam(args) => exam::run(&mut stdout, &settings, args)?,
        Commands::Config => config::run(&mut stdout, &settings)?,
    }

    Ok(())
}

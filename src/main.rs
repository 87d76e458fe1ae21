//! Sonara CLI
//!
//! Command-line interface for the Sonara effect engine.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sonara::cli::{commands, Cli, Commands};
use sonara::SonaraConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Sonara v{}", env!("CARGO_PKG_VERSION"));

    let config = SonaraConfig::resolve(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Some(Commands::Map {
            text,
            intensity,
            json,
        }) => commands::map(&config, &text, intensity, json)?,
        Some(Commands::Rewrite { text }) => commands::rewrite(&config, &text)?,
        Some(Commands::Keywords) => commands::keywords()?,
        None => {
            println!("Sonara v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
        }
    }
    Ok(())
}

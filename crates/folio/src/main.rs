//! Folio - page through large result sets across repeated calls.
//!
//! Main entry point for the Folio CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

mod commands;

use commands::{config, drain, page};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Folio - page through large result sets across repeated calls
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// User config directory (default: platform config dir)
    #[arg(long, global = true, env = "FOLIO_CONFIG_DIR")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a result file and read it page by page
    Page(page::PageArgs),

    /// Store a result file and drain every page
    Drain(drain::DrainArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

const CRATES: [&str; 5] = ["folio", "folio_agent", "folio_session", "folio_config", "folio_types"];

fn crate_filter(level: &str, rest: &str) -> String {
    let mut directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    directives.push(rest.to_string());
    directives.join(",")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = folio_config::load_config_with_options(None, cli.config.as_deref())?;
    let logging = loaded.config.logging();

    // Console (human-readable, stderr) + optional daily JSON file
    let console_filter = if cli.verbose {
        crate_filter("debug", "info")
    } else {
        crate_filter("info", "warn")
    };

    let log_dir = match logging.directory.clone() {
        Some(dir) => dir,
        None => cli
            .config
            .clone()
            .or_else(folio_config::user_config_dir)
            .map(|d| d.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs")),
    };

    let (file_layer, _guard) = if logging.file {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "folio.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(tracing_subscriber::EnvFilter::new(crate_filter("trace", "info")));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(console_filter)),
        )
        .with(file_layer)
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir: cli.config,
        loaded,
    };

    match cli.command {
        Commands::Page(args) => page::run(args, &ctx).await,
        Commands::Drain(args) => drain::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

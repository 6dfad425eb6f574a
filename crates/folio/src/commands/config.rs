//! Config command - configuration inspection.

use anyhow::Result;
use clap::{Args, Subcommand};
use folio_config::FolioConfig;
use serde_json::json;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Show which config files are checked and which were loaded
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let effective = FolioConfig {
        continuation: Some(ctx.continuation()),
        logging: Some(ctx.loaded.config.logging()),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    println!("# Folio Configuration\n");
    let sources = ctx.loaded.loaded_from();
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)\n");
    } else {
        for path in sources {
            println!("# Loaded: {}", path.display());
        }
        println!();
    }
    print!("{}", effective.to_toml()?);
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    if ctx.json_output {
        let sources: Vec<_> = ctx
            .loaded
            .sources
            .iter()
            .map(|s| json!({"path": s.path, "loaded": s.loaded}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&json!({ "sources": sources }))?);
        return Ok(());
    }

    if let Some(ref dir) = ctx.config_dir {
        println!("User config dir (from --config): {}", dir.display());
    }
    for source in &ctx.loaded.sources {
        let status = if source.loaded { "loaded" } else { "not found" };
        println!("{} ({})", source.path.display(), status);
    }
    Ok(())
}

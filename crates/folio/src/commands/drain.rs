//! Drain command - store a result file and collect every page.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use folio_agent::ContinuationDriver;
use folio_types::ResultItem;
use serde_json::json;

use super::{Context, default_session_key, describe, load_items};

/// Arguments for the drain command.
#[derive(Args, Debug)]
pub struct DrainArgs {
    /// JSON file holding an array of result items
    pub file: PathBuf,

    /// Items per page (default: from config)
    #[arg(short = 'n', long)]
    pub page_size: Option<usize>,
}

/// Run the drain command.
pub async fn run(args: DrainArgs, ctx: &Context) -> Result<()> {
    let page_size = ctx.page_size(args.page_size)?;
    let items = load_items(&args.file)?;
    let key = default_session_key(&args.file);

    let service = Arc::new(ctx.open_service()?);
    service.start(&key, items).await?;

    let driver = ContinuationDriver::new(Arc::clone(&service))
        .with_max_iterations(ctx.continuation().max_drain_iterations);
    let drained: Vec<ResultItem> = driver.drain_all(&key, page_size).await?;
    service.close().await;

    if ctx.json_output {
        let output = json!({
            "session_key": key,
            "total": drained.len(),
            "items": drained,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (i, item) in drained.iter().enumerate() {
            println!("{}. {}", i + 1, describe(item));
        }
        println!("{} items drained.", drained.len());
    }

    Ok(())
}

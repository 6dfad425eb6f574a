//! Page command - store a result file and read pages from it.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use folio_agent::Page;
use folio_types::ResultItem;
use serde_json::json;

use super::{Context, default_session_key, describe, load_items};

/// Arguments for the page command.
#[derive(Args, Debug)]
pub struct PageArgs {
    /// JSON file holding an array of result items
    pub file: PathBuf,

    /// Session key (default: the file name without extension)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Items per page (default: from config)
    #[arg(short = 'n', long)]
    pub page_size: Option<usize>,

    /// Number of pages to read
    #[arg(short, long, default_value_t = 1)]
    pub pages: usize,
}

/// Run the page command.
pub async fn run(args: PageArgs, ctx: &Context) -> Result<()> {
    let page_size = ctx.page_size(args.page_size)?;
    let items = load_items(&args.file)?;
    let key = args
        .session
        .clone()
        .unwrap_or_else(|| default_session_key(&args.file));

    let service = ctx.open_service()?;
    let receipt = service.start(&key, items).await?;
    if ctx.verbose && !ctx.json_output {
        println!(
            "Stored {} items under '{}' (generation {})",
            receipt.total, receipt.session_key, receipt.generation
        );
    }

    let mut pages = Vec::new();
    for _ in 0..args.pages {
        let page = service.next(&key, Some(page_size)).await?;
        let done = page.exhausted;
        pages.push(page);
        if done {
            break;
        }
    }
    let has_more = service.has_more(&key).await?;
    service.close().await;

    if ctx.json_output {
        let output = json!({
            "session_key": key,
            "pages": pages,
            "has_more": has_more,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (index, page) in pages.iter().enumerate() {
            print_page(index + 1, page);
        }
        if has_more {
            println!("More results available.");
        } else {
            println!("All results delivered.");
        }
    }

    Ok(())
}

fn print_page(number: usize, page: &Page<ResultItem>) {
    let first = page.offset - page.len();
    if page.is_empty() {
        println!("Page {}: no items ({} total)", number, page.total);
        return;
    }
    println!(
        "Page {}: items {}-{} of {}",
        number,
        first + 1,
        page.offset,
        page.total
    );
    for (i, item) in page.items.iter().enumerate() {
        println!("  {}. {}", first + i + 1, describe(item));
    }
}

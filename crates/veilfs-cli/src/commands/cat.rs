use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use veilfs_core::Storage;

use crate::output::{create_table, format_kind, format_size};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// File path within the tree
    pub file: String,

    /// Print the file as JSON (media is base64 encoded)
    #[arg(long, conflicts_with = "info")]
    pub json: bool,

    /// Show file details instead of contents
    #[arg(long)]
    pub info: bool,
}

pub async fn execute(storage: &Storage, args: &Args) -> Result<()> {
    if args.json || args.info {
        let view = storage
            .read_view(&args.file)
            .await
            .with_context(|| format!("Failed to read '{}'", args.file))?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else {
            let mut table = create_table();
            table.add_row(vec!["Path", view.path.as_str()]);
            table.add_row(vec!["Kind".to_string(), format_kind(view.kind)]);
            table.add_row(vec!["Lines".to_string(), view.lines.to_string()]);
            table.add_row(vec!["Size".to_string(), format_size(view.bytes()?.len() as u64)]);
            println!("{table}");
        }
        return Ok(());
    }

    let content = storage
        .read_file(&args.file)
        .await
        .with_context(|| format!("Failed to read '{}'", args.file))?;
    io::stdout().write_all(&content)?;
    Ok(())
}

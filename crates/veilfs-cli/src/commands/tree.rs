//! Tree command - show the whole decrypted tree.
//!
//! # Examples
//!
//! ```bash
//! veilfs --identity alice tree
//!
//! # Export with the type table for scripting
//! veilfs --identity alice tree --json | jq '.types'
//! ```

use std::fmt::Write as _;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use veilfs_core::{NodeSnapshot, Storage};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output the tree and type table as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::tree", skip_all)]
pub async fn execute(storage: &Storage, args: &Args) -> Result<()> {
    if args.json {
        let export = storage.export().await;
        println!("{}", serde_json::to_string_pretty(&export)?);
    } else {
        print!("{}", render(&storage.tree().await));
    }
    Ok(())
}

/// Render a snapshot as an indented tree with box-drawing guides.
pub fn render(root: &NodeSnapshot) -> String {
    let mut out = String::from("/\n");
    render_children(root, "", &mut out);
    out
}

fn render_children(node: &NodeSnapshot, prefix: &str, out: &mut String) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        let suffix = if child.is_dir() { "/" } else { "" };
        let _ = writeln!(out, "{prefix}{branch}{}{suffix}", child.name);

        let nested = format!("{prefix}{}", if last { "    " } else { "│   " });
        render_children(child, &nested, out);
    }
}

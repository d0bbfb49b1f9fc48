//! List command - list directory contents.
//!
//! # Examples
//!
//! ```bash
//! # List root directory
//! veilfs --identity alice ls
//!
//! # List with kinds
//! veilfs --identity alice ls -l /documents
//!
//! # Output as JSON for scripting
//! veilfs --identity alice ls --json / | jq '.entries[].name'
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::instrument;

use veilfs_core::tree::LogicalPath;
use veilfs_core::{NodeSnapshot, Storage, StorageError};

use super::display_path;
use crate::output::{create_table, format_entry_type, format_kind};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path within the tree (default: root)
    #[arg(default_value = "/")]
    pub path: String,

    /// Show detailed information
    #[arg(short, long)]
    pub long: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output format for ls command
#[derive(Serialize)]
struct LsOutput {
    path: String,
    entries: Vec<EntryInfo>,
}

#[derive(Serialize)]
struct EntryInfo {
    name: String,
    #[serde(rename = "type")]
    entry_type: String,
    kind: u16,
}

#[instrument(level = "info", name = "cmd::ls", skip_all, fields(path = %args.path))]
pub async fn execute(storage: &Storage, args: &Args) -> Result<()> {
    let logical = LogicalPath::parse(&args.path);
    let tree = storage.tree().await;

    let dir = tree
        .find(&logical.tree_path())
        .ok_or_else(|| StorageError::NotFound { path: logical.as_str().to_string() })?;
    if !dir.is_dir() {
        return Err(StorageError::NotADirectory { path: logical.as_str().to_string() }.into());
    }

    if args.json {
        print_json(&display_path(&args.path), dir)?;
    } else if args.long {
        print_long_format(dir);
    } else {
        for child in &dir.children {
            let suffix = if child.is_dir() { "/" } else { "" };
            println!("{}{suffix}", child.name);
        }
    }

    Ok(())
}

fn print_json(path: &str, dir: &NodeSnapshot) -> Result<()> {
    let output = LsOutput {
        path: path.to_string(),
        entries: dir
            .children
            .iter()
            .map(|child| EntryInfo {
                name: child.name.clone(),
                entry_type: if child.is_dir() { "directory" } else { "file" }.to_string(),
                kind: child.kind.bits(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_long_format(dir: &NodeSnapshot) {
    let mut table = create_table();
    table.set_header(vec!["", "Kind", "Name"]);
    for child in &dir.children {
        table.add_row(vec![
            format_entry_type(child.is_dir()).to_string(),
            format_kind(child.kind),
            child.name.clone(),
        ]);
    }
    println!("{table}");
}

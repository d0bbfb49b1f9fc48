use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use veilfs_core::Storage;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// File path within the tree
    pub path: String,

    /// Fail instead of overwriting an existing file
    #[arg(short, long)]
    pub no_clobber: bool,
}

#[instrument(level = "info", name = "cmd::write", skip_all, fields(path = %args.path))]
pub async fn execute(storage: &Storage, args: &Args) -> Result<()> {
    let mut content = Vec::new();
    io::stdin()
        .read_to_end(&mut content)
        .context("Failed to read stdin")?;

    if args.no_clobber {
        storage.write_new(&args.path, &content).await?;
    } else {
        storage.write_file(&args.path, &content).await?;
    }
    Ok(())
}

use anyhow::Result;
use clap::Args as ClapArgs;

use veilfs_core::Storage;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path to remove; directories are removed with their contents
    pub path: String,

    /// Ignore nonexistent paths
    #[arg(short, long)]
    pub force: bool,
}

pub async fn execute(storage: &Storage, args: &Args) -> Result<()> {
    match storage.delete(&args.path).await {
        Err(e) if args.force && e.is_not_found() => {
            tracing::debug!(path = %args.path, "Nothing to remove");
            Ok(())
        }
        result => Ok(result?),
    }
}

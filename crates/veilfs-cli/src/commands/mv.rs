use anyhow::Result;
use clap::Args as ClapArgs;

use veilfs_core::Storage;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Source path
    pub source: String,

    /// New name, relative to the source's parent directory
    pub new_name: String,
}

pub async fn execute(storage: &Storage, args: &Args) -> Result<()> {
    storage.rename(&args.source, &args.new_name).await?;
    Ok(())
}

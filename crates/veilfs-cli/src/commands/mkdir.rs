use anyhow::Result;
use clap::Args as ClapArgs;

use veilfs_core::Storage;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Directory path to create; missing parents are created too
    pub path: String,
}

pub async fn execute(storage: &Storage, args: &Args) -> Result<()> {
    storage.create_dir(&args.path).await?;
    Ok(())
}

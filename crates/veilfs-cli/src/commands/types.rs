use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args as ClapArgs;

use veilfs_core::type_table;

use crate::output::create_table;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: &Args) -> Result<()> {
    let table = type_table();

    if args.json {
        let map: BTreeMap<_, _> = table.into_iter().collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    let mut out = create_table();
    out.set_header(vec!["Name", "Bits", "Hex"]);
    for (name, bits) in table {
        out.add_row(vec![name.to_string(), bits.to_string(), format!("{bits:#06x}")]);
    }
    println!("{out}");
    Ok(())
}

//! Split a DN into RDN and parent

use clap::Args;
use immom::dn::split_dn;

use crate::error::CliResult;
use crate::output::print_warning;

/// Split a DN into its RDN and parent
#[derive(Args, Debug)]
pub struct SplitDnArgs {
    /// Distinguished name
    pub dn: String,
}

/// Execute the split-dn command
pub fn execute(args: SplitDnArgs) -> CliResult<()> {
    let (rdn, parent) = split_dn(&args.dn)?;
    println!("rdn:    {rdn}");
    println!("parent: {parent}");
    if parent.is_empty() {
        print_warning("top-level object, parent is the root");
    }
    Ok(())
}

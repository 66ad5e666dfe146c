//! Tree navigation

use clap::Args;

use immom::dn::ROOT;

use crate::config::{GlobalArgs, Model};
use crate::error::CliResult;
use crate::output::format_tree;

/// Show the object tree below a DN
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Root of the tree (the whole model when omitted)
    #[arg(default_value = ROOT)]
    pub dn: String,

    /// Print full DNs, one per line
    #[arg(long)]
    pub flat: bool,
}

/// List the direct children of a DN
#[derive(Args, Debug)]
pub struct ChildrenArgs {
    /// Parent DN (top-level objects when omitted)
    #[arg(default_value = ROOT)]
    pub dn: String,
}

/// List the instances of a class
#[derive(Args, Debug)]
pub struct InstancesArgs {
    /// Class name
    pub class: String,

    /// Only search below this DN
    #[arg(long, default_value = ROOT)]
    pub root: String,
}

/// Execute the tree command
pub async fn execute(args: TreeArgs, global: &GlobalArgs) -> CliResult<()> {
    let model = Model::open(global).await?;
    let dns = model.session.get_subtree(&args.dn).await?;
    model.close().await?;

    if args.flat {
        for dn in dns {
            println!("{dn}");
        }
    } else {
        print!("{}", format_tree(&args.dn, &dns)?);
    }
    Ok(())
}

/// Execute the children command
pub async fn execute_children(args: ChildrenArgs, global: &GlobalArgs) -> CliResult<()> {
    let model = Model::open(global).await?;
    let dns = model.session.get_child_objects(&args.dn).await?;
    model.close().await?;

    for dn in dns {
        println!("{dn}");
    }
    Ok(())
}

/// Execute the instances command
pub async fn execute_instances(args: InstancesArgs, global: &GlobalArgs) -> CliResult<()> {
    let model = Model::open(global).await?;
    let mut dns = model
        .session
        .get_instance_of(&args.root, &args.class)
        .await?;
    model.close().await?;

    dns.sort();
    for dn in dns {
        println!("{dn}");
    }
    Ok(())
}

//! Class listing and description

use clap::Args;

use crate::config::{GlobalArgs, Model};
use crate::error::CliResult;
use crate::output::format_class;

/// List every registered class
#[derive(Args, Debug)]
pub struct ClassesArgs {
    /// Only CONFIG classes
    #[arg(long, conflicts_with = "runtime")]
    pub config: bool,

    /// Only RUNTIME classes
    #[arg(long)]
    pub runtime: bool,
}

/// Show a class definition
#[derive(Args, Debug)]
pub struct ClassArgs {
    /// Class name
    pub name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the classes command
pub async fn execute_list(args: ClassesArgs, global: &GlobalArgs) -> CliResult<()> {
    let model = Model::open(global).await?;
    let names: Vec<String> = if args.config {
        model.session.config_classes().await?.into_iter().collect()
    } else if args.runtime {
        model.session.runtime_classes().await?.into_iter().collect()
    } else {
        model.session.get_class_names().await?
    };
    model.close().await?;

    for name in names {
        println!("{name}");
    }
    Ok(())
}

/// Execute the class command
pub async fn execute(args: ClassArgs, global: &GlobalArgs) -> CliResult<()> {
    let model = Model::open(global).await?;
    let class = model.session.get_class(&args.name).await?;
    model.close().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&class)?);
    } else {
        print!("{}", format_class(&class));
    }
    Ok(())
}

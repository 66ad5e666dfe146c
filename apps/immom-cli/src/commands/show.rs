//! Show one object

use clap::Args;

use crate::config::{GlobalArgs, Model};
use crate::error::CliResult;
use crate::output::format_object;

/// Show every attribute of an object
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Distinguished name of the object
    pub dn: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the show command
pub async fn execute(args: ShowArgs, global: &GlobalArgs) -> CliResult<()> {
    let model = Model::open(global).await?;
    let object = model.session.get_object(&args.dn).await?;
    model.close().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&object)?);
    } else {
        print!("{}", format_object(&object));
    }
    Ok(())
}

//! Export the model as IMM XML

use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use immom::dump::DumpOptions;

use crate::config::{GlobalArgs, Model};
use crate::error::{CliError, CliResult};

/// Export the model as IMM XML
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Write to file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Declare the imm namespace on the root element
    #[arg(long)]
    pub namespace: bool,
}

/// Execute the dump command
pub async fn execute(args: DumpArgs, global: &GlobalArgs) -> CliResult<()> {
    let model = Model::open(global).await?;
    let options = DumpOptions {
        declare_namespace: args.namespace,
    };
    let xml = model.session.dump_all(Vec::new(), &options).await?;
    model.close().await?;

    if let Some(ref output_path) = args.output {
        write_to_file(output_path, &xml)?;
        eprintln!("Model exported to {}", output_path.display());
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&xml)?;
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

/// Write content to file
fn write_to_file(path: &PathBuf, content: &[u8]) -> CliResult<()> {
    let mut file = std::fs::File::create(path)
        .map_err(|e| CliError::Io(format!("Failed to create file {}: {}", path.display(), e)))?;

    file.write_all(content)
        .map_err(|e| CliError::Io(format!("Failed to write to file {}: {}", path.display(), e)))?;

    Ok(())
}

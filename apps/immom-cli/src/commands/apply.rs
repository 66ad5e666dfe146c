//! Apply a change file as one CCB

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::changes::{self, ChangeFile};
use crate::config::{GlobalArgs, Model};
use crate::error::CliResult;
use crate::output::{print_success, print_warning};

/// Apply a change file as one CCB
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to change file
    pub file: PathBuf,

    /// Write the updated model back to the snapshot file
    #[arg(long, conflicts_with = "dry_run")]
    pub write: bool,

    /// Validate the changes without committing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the apply command
pub async fn execute(args: ApplyArgs, global: &GlobalArgs) -> CliResult<()> {
    let file = ChangeFile::load(&args.file)?;
    let mut model = Model::open(global).await?;
    model
        .session
        .admin_owner_initialize(global.admin_owner())
        .await?;

    changes::run(&mut model.session, &file, !args.dry_run).await?;

    if args.dry_run {
        model.close().await?;
        print_success(&format!("{} changes validated", file.changes.len()));
        return Ok(());
    }

    if args.write {
        let path = global.snapshot_path()?;
        let imm = model.imm.clone();
        // Closing releases the admin owner's objects before they are captured
        model.close().await?;
        imm.snapshot().await.save(path)?;
        info!(path = %path.display(), "Snapshot written");
        print_success(&format!(
            "{} changes applied, model written to {}",
            file.changes.len(),
            path.display()
        ));
    } else {
        model.close().await?;
        print_success(&format!("{} changes applied", file.changes.len()));
        print_warning("model not saved, pass --write to keep the changes");
    }
    Ok(())
}

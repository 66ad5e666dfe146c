//! Configuration for the immom CLI

use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use immom::config::SessionConfig;
use immom::Session;
use immom_memory::{InMemoryImm, Snapshot};

use crate::error::{CliError, CliResult};

/// Admin owner name used when none is configured.
pub const DEFAULT_ADMIN_OWNER: &str = "immom";

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Snapshot file holding the model (.json, .yaml or .yml)
    #[arg(long, short = 's', env = "IMMOM_SNAPSHOT", global = true)]
    pub snapshot: Option<PathBuf>,

    /// Admin owner name used for changes
    #[arg(long, env = "IMMOM_ADMIN_OWNER", global = true)]
    pub admin_owner: Option<String>,

    /// YAML file with session settings
    #[arg(long, env = "IMMOM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Admin owner name, falling back to [`DEFAULT_ADMIN_OWNER`].
    pub fn admin_owner(&self) -> &str {
        self.admin_owner.as_deref().unwrap_or(DEFAULT_ADMIN_OWNER)
    }

    /// The snapshot path, required by every command that reads the model.
    pub fn snapshot_path(&self) -> CliResult<&Path> {
        self.snapshot
            .as_deref()
            .ok_or_else(|| CliError::Config("no snapshot file given".to_string()))
    }

    /// Session settings from `--config`, or the defaults.
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        match &self.config {
            Some(path) => load_session_config(path),
            None => Ok(SessionConfig::default()),
        }
    }
}

/// Read and validate a YAML session configuration file.
pub fn load_session_config(path: &Path) -> CliResult<SessionConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let config: SessionConfig = serde_yaml::from_str(&text).map_err(|e| {
        CliError::Config(format!("invalid session config {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// The loaded model: the service and a session opened on it.
pub struct Model {
    pub imm: Arc<InMemoryImm>,
    pub session: Session,
}

impl Model {
    /// Load the snapshot and open a session against it.
    pub async fn open(args: &GlobalArgs) -> CliResult<Self> {
        let snapshot = Snapshot::load(args.snapshot_path()?)?;
        let imm = Arc::new(InMemoryImm::from_snapshot(&snapshot)?);
        let session = Session::open(imm.clone(), args.session_config()?).await?;
        Ok(Self { imm, session })
    }

    /// Close the session.
    pub async fn close(self) -> CliResult<()> {
        self.session.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_admin_owner_default() {
        let args = GlobalArgs::default();
        assert_eq!(args.admin_owner(), DEFAULT_ADMIN_OWNER);
        assert!(matches!(args.snapshot_path(), Err(CliError::Config(_))));
    }

    #[test]
    fn test_load_session_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_name_length: 64\nrelease_ownership_on_finalize: false").unwrap();

        let config = load_session_config(file.path()).unwrap();
        assert_eq!(config.max_name_length, 64);
        assert!(!config.release_ownership_on_finalize);
        assert_eq!(config.admin_operation_timeout_secs, 60);
    }

    #[test]
    fn test_load_session_config_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_name_length: 0").unwrap();
        assert!(load_session_config(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_name_length: [").unwrap();
        assert!(matches!(
            load_session_config(file.path()),
            Err(CliError::Config(_))
        ));
    }
}

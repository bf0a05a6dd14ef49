use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;
use crate::{destination_for, SyncConfig, TransferConfig, Destination};

/// Result of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced { output: String },
    /// The tool ran and exited non-zero
    Failed { status: Option<i32>, output: String },
    /// The tool could not be started at all
    SpawnFailed { error: String },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }
}

/// Mirrors the tree after a change. Implementations block until done.
pub trait Transfer {
    fn sync(&self, changed: &Path) -> SyncOutcome;
}

/// Runs the external transfer tool over the whole tree.
pub struct RsyncDispatcher {
    config: Arc<SyncConfig>,
}

impl RsyncDispatcher {
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self { config }
    }

    pub fn command(&self) -> Command {
        let transfer = &self.config.transfer;
        let mut cmd = Command::new(&transfer.program);
        cmd.args(transfer_args(transfer, &self.config.destination))
            .current_dir(&self.config.root_path);
        cmd
    }
}

impl Transfer for RsyncDispatcher {
    fn sync(&self, changed: &Path) -> SyncOutcome {
        let config = &self.config;
        tracing::info!(
            "Syncing: {} to location: {}:{}",
            changed.display(),
            config.destination.address,
            destination_for(config, changed)
        );

        let outcome = match self.command().output() {
            Ok(output) => outcome_from(output),
            Err(err) => SyncOutcome::SpawnFailed {
                error: format!("failed to run {}: {}", config.transfer.program, err),
            },
        };

        match &outcome {
            SyncOutcome::Synced { output } => {
                tracing::info!("Synced: {}", changed.display());
                if config.verbose {
                    tracing::info!("RSYNC: {}", output);
                }
            }
            SyncOutcome::Failed { status, output } => {
                let status = status.map_or_else(|| "signal".to_string(), |code| code.to_string());
                tracing::error!("Transfer failed (exit {}), output: {}", status, output);
            }
            SyncOutcome::SpawnFailed { error } => {
                tracing::error!("Transfer failed: {}", error);
            }
        }

        outcome
    }
}

/// Arguments for a full-tree transfer from the working directory to the
/// destination, in the order rsync expects them.
pub fn transfer_args(transfer: &TransferConfig, destination: &Destination) -> Vec<OsString> {
    let mut args: Vec<OsString> = transfer.archive_flags.iter().map(OsString::from).collect();
    args.push(".".into());
    args.push(destination.target().into());
    args.push(format!("--include=**{}", transfer.ignore_file).into());
    for pattern in &transfer.exclude {
        args.push(format!("--exclude={}", pattern).into());
    }
    args.push(format!("--filter=:- {}", transfer.ignore_file).into());
    if transfer.delete_after {
        args.push("--delete-after".into());
    }
    args.extend(transfer.extra_args.iter().map(OsString::from));
    args
}

fn outcome_from(output: Output) -> SyncOutcome {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        SyncOutcome::Synced { output: combined }
    } else {
        SyncOutcome::Failed {
            status: output.status.code(),
            output: combined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config_with(root: &Path, transfer: TransferConfig) -> Arc<SyncConfig> {
        Arc::new(
            SyncConfig::new(root.to_path_buf(), Destination::new("devbox", "/srv/project"), true)
                .with_transfer(transfer),
        )
    }

    #[test]
    fn test_default_args() {
        let args = transfer_args(&TransferConfig::default(), &Destination::new("devbox", "/srv/project"));
        let expected: Vec<OsString> = [
            "-avz",
            ".",
            "devbox:/srv/project",
            "--include=**.gitignore",
            "--exclude=/.git",
            "--filter=:- .gitignore",
            "--delete-after",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        assert_eq!(args, expected);
    }

    #[test]
    fn test_args_follow_configuration() {
        let transfer = TransferConfig {
            ignore_file: ".syncignore".to_string(),
            exclude: vec!["/.git".to_string(), "/target".to_string()],
            delete_after: false,
            extra_args: vec!["--dry-run".to_string()],
            ..TransferConfig::default()
        };
        let args = transfer_args(&transfer, &Destination::new("h", "/d"));

        assert!(args.contains(&OsString::from("--include=**.syncignore")));
        assert!(args.contains(&OsString::from("--exclude=/target")));
        assert!(args.contains(&OsString::from("--filter=:- .syncignore")));
        assert!(!args.contains(&OsString::from("--delete-after")));
        assert_eq!(args.last(), Some(&OsString::from("--dry-run")));
    }

    #[test]
    fn test_command_runs_in_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let dispatcher = RsyncDispatcher::new(config_with(temp_dir.path(), TransferConfig::default()));

        let cmd = dispatcher.command();
        assert_eq!(cmd.get_program(), "rsync");
        assert_eq!(cmd.get_current_dir(), Some(temp_dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_transfer() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let transfer = TransferConfig {
            program: "echo".to_string(),
            ..TransferConfig::default()
        };
        let dispatcher = RsyncDispatcher::new(config_with(temp_dir.path(), transfer));

        match dispatcher.sync(&temp_dir.path().join("a.txt")) {
            SyncOutcome::Synced { output } => {
                assert!(output.contains("devbox:/srv/project"));
                assert!(output.contains("--delete-after"));
            }
            other => panic!("Expected success, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let transfer = TransferConfig {
            program: "false".to_string(),
            ..TransferConfig::default()
        };
        let dispatcher = RsyncDispatcher::new(config_with(temp_dir.path(), transfer));

        let outcome = dispatcher.sync(&temp_dir.path().join("a.txt"));
        assert!(matches!(outcome, SyncOutcome::Failed { status: Some(1), .. }));
    }

    #[test]
    fn test_missing_program_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let transfer = TransferConfig {
            program: "filesync-no-such-transfer-tool".to_string(),
            ..TransferConfig::default()
        };
        let dispatcher = RsyncDispatcher::new(config_with(temp_dir.path(), transfer));

        let outcome = dispatcher.sync(&PathBuf::from("/anywhere"));
        assert!(matches!(outcome, SyncOutcome::SpawnFailed { .. }));
        assert!(!outcome.is_success());
    }
}

//! Configuration for filesync
//!
//! The configuration is built once at startup from the command line, an
//! optional TOML file and a few environment variables. It is never mutated
//! afterwards and is shared read-only by the watcher, the coordinator and
//! the transfer dispatcher.

use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Absolute path of the tree being watched
    pub root_path: PathBuf,
    /// Remote side of the mirror
    pub destination: Destination,
    /// Echo raw transfer tool output
    pub verbose: bool,
    /// How the transfer tool is invoked
    pub transfer: TransferConfig,
    /// Event queue and dispatch tuning
    pub watcher: WatcherConfig,
}

/// Remote host and folder the tree is mirrored to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Host name or ssh config alias
    pub address: String,
    /// Folder on the remote host, used verbatim
    pub folder: String,
}

/// Transfer tool invocation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Program to spawn
    pub program: String,
    /// Archive/compress/verbose flags passed first
    pub archive_flags: Vec<String>,
    /// Per-directory ignore-rules file honored as an exclusion filter
    pub ignore_file: String,
    /// Patterns always excluded, anchored at the tree root
    pub exclude: Vec<String>,
    /// Delete vanished files on the remote once the transfer succeeded
    pub delete_after: bool,
    /// Appended verbatim after the generated arguments
    pub extra_args: Vec<String>,
}

/// Configuration for the event queue and dispatch loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Bound of the notification queue; `None` means unbounded
    pub queue_capacity: Option<usize>,
    /// Coalescing window in milliseconds; 0 dispatches once per sync action
    pub coalesce_ms: u64,
}

/// Optional overrides read from a TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileOverrides {
    pub transfer: Option<TransferConfig>,
    pub watcher: Option<WatcherConfig>,
}

impl Destination {
    pub fn new(address: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            folder: folder.into(),
        }
    }

    /// `<address>:<folder>` as understood by rsync over ssh
    pub fn target(&self) -> String {
        format!("{}:{}", self.address, self.folder)
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            program: "rsync".to_string(),
            archive_flags: vec!["-avz".to_string()],
            ignore_file: ".gitignore".to_string(),
            exclude: vec!["/.git".to_string()],
            delete_after: true,
            extra_args: Vec::new(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: None,
            coalesce_ms: 0,
        }
    }
}

impl WatcherConfig {
    /// Get the coalescing window, if enabled
    pub fn coalesce_window(&self) -> Option<Duration> {
        if self.coalesce_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.coalesce_ms))
        }
    }
}

impl SyncConfig {
    pub fn new(root_path: PathBuf, destination: Destination, verbose: bool) -> Self {
        Self {
            root_path,
            destination,
            verbose,
            transfer: TransferConfig::default(),
            watcher: WatcherConfig::default(),
        }
    }

    pub fn with_transfer(mut self, transfer: TransferConfig) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn with_watcher(mut self, watcher: WatcherConfig) -> Self {
        self.watcher = watcher;
        self
    }

    /// Apply overrides from a TOML file
    pub fn merge_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let overrides: FileOverrides = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if let Some(transfer) = overrides.transfer {
            self.transfer = transfer;
        }
        if let Some(watcher) = overrides.watcher {
            self.watcher = watcher;
        }
        Ok(self)
    }

    /// Override the transfer settings with environment variables if present
    pub fn merge_env(self) -> Self {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Same as `merge_env`, reading variables through `lookup`
    pub fn merge_vars<F: Fn(&str) -> Option<String>>(mut self, lookup: F) -> Self {
        if let Some(val) = lookup("FILESYNC_RSYNC_PROGRAM") {
            if !val.is_empty() {
                self.transfer.program = val;
            }
        }

        if let Some(val) = lookup("FILESYNC_IGNORE_FILE") {
            if !val.is_empty() {
                self.transfer.ignore_file = val;
            }
        }

        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.destination.folder.is_empty() {
            return Err("destination folder must not be empty".to_string());
        }

        if self.destination.address.is_empty() {
            return Err("ssh address must not be empty".to_string());
        }

        if self.transfer.program.is_empty() {
            return Err("transfer program must not be empty".to_string());
        }

        if self.watcher.queue_capacity == Some(0) {
            return Err("queue_capacity must be greater than 0".to_string());
        }

        if !self.root_path.is_absolute() {
            return Err(format!("root path must be absolute: {}", self.root_path.display()));
        }

        Ok(())
    }
}

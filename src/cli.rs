use std::path::PathBuf;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crate::{Destination, SyncConfig};

#[derive(Parser, Debug)]
#[command(name = "filesync")]
#[command(version)]
#[command(about = "Sync the current folder to a destination folder on a remote machine when file changes occur")]
#[command(long_about = "filesync watches the current directory tree and runs rsync over ssh every time something in it changes. New subdirectories are picked up as they appear, editor backup files ending in '~' are ignored, and .gitignore rules are honored on the remote side.")]
pub struct Cli {
    /// Folder on the remote machine to mirror into
    #[arg(value_name = "DEST_FOLDER", help = "Destination folder on the remote machine")]
    pub dest_folder: Option<String>,

    /// Remote host
    #[arg(long, value_name = "HOST", help = "The ssh address of the machine to sync files to. This can be a hostname given in ssh config.")]
    pub ssh_address: String,

    /// Enable verbose logging
    #[arg(short, long, help = "Also print rsync output")]
    pub verbose: bool,

    /// Disable colors in output
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    /// TOML file with [transfer] and [watcher] overrides
    #[arg(long, value_name = "FILE", help = "Configuration file")]
    pub config: Option<PathBuf>,

    /// Coalescing window; 0 syncs once per change
    #[arg(long, value_name = "MS", help = "Merge changes arriving within this many ms into one sync (0 disables)")]
    pub coalesce_ms: Option<u64>,

    /// Bound of the event queue
    #[arg(long, value_name = "N", help = "Bound the event queue (default unbounded)")]
    pub queue_capacity: Option<usize>,
}

impl Cli {
    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(!self.no_color)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }

    pub fn validate(&self) -> Result<(), String> {
        match &self.dest_folder {
            Some(folder) if !folder.is_empty() => {}
            _ => {
                return Err("Missing destination folder argument.\n\
                     Please specify the destination folder as the first argument.\n\
                     Use the -h flag to see available options."
                    .to_string())
            }
        }

        if self.ssh_address.is_empty() {
            return Err("ssh address must not be empty".to_string());
        }

        if self.queue_capacity == Some(0) {
            return Err("Queue capacity must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Build the configuration for the current directory.
    pub fn to_config(&self) -> Result<SyncConfig> {
        let root = std::env::current_dir().context("Failed to determine current directory")?;
        self.config_for(root)
    }

    pub fn config_for(&self, root_path: PathBuf) -> Result<SyncConfig> {
        let folder = self
            .dest_folder
            .clone()
            .ok_or_else(|| anyhow!("Missing destination folder argument"))?;

        let mut config = SyncConfig::new(
            root_path,
            Destination::new(self.ssh_address.clone(), folder),
            self.verbose,
        );

        if let Some(path) = &self.config {
            config = config.merge_file(path)?;
        }
        config = config.merge_env();

        // flags given on the command line win over the file
        let mut watcher = config.watcher.clone();
        if let Some(coalesce_ms) = self.coalesce_ms {
            watcher.coalesce_ms = coalesce_ms;
        }
        if self.queue_capacity.is_some() {
            watcher.queue_capacity = self.queue_capacity;
        }
        config = config.with_watcher(watcher);

        config.validate().map_err(|err| anyhow!(err))?;
        Ok(config)
    }
}

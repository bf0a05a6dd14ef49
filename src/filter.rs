use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::{ChangeKinds, Classification, RawEvent, SyncAction};

/// Suffix editors use for backup and swap files
pub const IGNORE_SUFFIX: char = '~';

/// Decides what a raw filesystem event means for the mirror.
pub struct EventFilter;

impl EventFilter {
    pub fn new() -> Self {
        Self
    }

    /// Classify one event into an optional sync action and an optional
    /// directory registration request.
    pub fn classify(&self, event: &RawEvent) -> Classification {
        let path = match absolute_path(&event.path) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!("Dropping event for {}: {:#}", event.path.display(), err);
                return Classification::ignored();
            }
        };

        if self.is_ignored(&path) {
            tracing::debug!("Ignoring {} ({})", path.display(), event.kinds);
            return Classification::ignored();
        }

        let mut classification = Classification::ignored();

        if event.kinds.is_sync_worthy() {
            classification.sync = Some(SyncAction { path: path.clone() });
        }

        // A directory moved into the tree arrives as a rename of its new
        // path. The directory may be gone again by now; the metadata check
        // reflects the tree as it is at classification time.
        if event.kinds.intersects(ChangeKinds::CREATE | ChangeKinds::RENAME) && is_directory(&path) {
            classification.register = Some(path);
        }

        classification
    }

    pub fn is_ignored<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref()
            .as_os_str()
            .to_string_lossy()
            .ends_with(IGNORE_SUFFIX)
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    Ok(cwd.join(path))
}

fn is_directory(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

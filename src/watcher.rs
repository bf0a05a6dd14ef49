use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use notify::{Event, EventHandler, RecommendedWatcher, RecursiveMode, Watcher};
use ignore::WalkBuilder;
use anyhow::{Result, Context};
use crate::WatcherConfig;

pub type NotifyResult = notify::Result<Event>;

/// Something that can start delivering notifications for a single directory.
pub trait DirectoryWatcher {
    fn add(&mut self, path: &Path) -> notify::Result<()>;
}

impl DirectoryWatcher for RecommendedWatcher {
    fn add(&mut self, path: &Path) -> notify::Result<()> {
        self.watch(path, RecursiveMode::NonRecursive)
    }
}

/// Owns the set of watched directories under a root.
///
/// Directories are only ever added. A removed directory keeps its entry;
/// the backend simply stops reporting events for it. The set is bookkeeping
/// only and never decides whether the backend gets asked.
pub struct WatchTree<W: DirectoryWatcher> {
    root: PathBuf,
    watcher: W,
    watched: HashSet<PathBuf>,
}

impl<W: DirectoryWatcher> WatchTree<W> {
    pub fn new<P: AsRef<Path>>(root: P, watcher: W) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            watcher,
            watched: HashSet::new(),
        }
    }

    /// Walk the whole tree and watch every directory in it, hidden and
    /// ignored ones included. Any failure here is fatal for the caller.
    pub fn initialize(&mut self) -> Result<usize> {
        let root = self.root.clone();
        for result in walk(&root) {
            let entry = result.with_context(|| format!("Failed to walk {}", root.display()))?;
            if entry.file_type().map_or(false, |t| t.is_dir()) {
                let path = entry.into_path();
                self.watcher
                    .add(&path)
                    .with_context(|| format!("Failed to watch directory {}", path.display()))?;
                self.watched.insert(path);
            }
        }

        tracing::info!("Watching {} directories under {}", self.watched.len(), root.display());
        Ok(self.watched.len())
    }

    /// Watch a directory that appeared after startup, along with anything
    /// already nested inside it. Returns false if the directory itself
    /// could not be registered.
    pub fn register_new_directory<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        if !self.add(path) {
            return false;
        }

        // `mkdir -p` or a moved-in tree can create children before the
        // parent watch exists.
        for result in walk(path).skip(1) {
            match result {
                Ok(entry) if entry.file_type().map_or(false, |t| t.is_dir()) => {
                    self.add(entry.path());
                }
                Ok(_) => {}
                Err(err) => tracing::warn!("Error walking {}: {}", path.display(), err),
            }
        }
        true
    }

    /// Always goes to the backend: a directory removed and created again
    /// under the same path is a new inode whose old watch is gone, even
    /// though its path is still in the set.
    fn add(&mut self, path: &Path) -> bool {
        match self.watcher.add(path) {
            Ok(()) => {
                if self.watched.insert(path.to_path_buf()) {
                    tracing::info!("Watching new directory {}", path.display());
                } else {
                    tracing::debug!("Watching {} again", path.display());
                }
                true
            }
            Err(err) => {
                tracing::warn!("Failed to add directory {}: {}", path.display(), err);
                false
            }
        }
    }

    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        self.watched.contains(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn walk(path: &Path) -> ignore::Walk {
    WalkBuilder::new(path)
        .standard_filters(false)
        .follow_links(false)
        .build()
}

/// Sending half of the notification queue handed to notify.
///
/// The unbounded variant never blocks. The bounded variant blocks notify's
/// delivery thread while the queue is full; neither drops events.
pub enum EventSender {
    Unbounded(Sender<NotifyResult>),
    Bounded(SyncSender<NotifyResult>),
}

impl EventHandler for EventSender {
    fn handle_event(&mut self, event: NotifyResult) {
        let sent = match self {
            EventSender::Unbounded(tx) => tx.send(event).is_ok(),
            EventSender::Bounded(tx) => tx.send(event).is_ok(),
        };
        if !sent {
            tracing::debug!("Event queue closed, dropping notification");
        }
    }
}

/// Build the notification queue according to the configured capacity.
pub fn event_channel(config: &WatcherConfig) -> (EventSender, Receiver<NotifyResult>) {
    match config.queue_capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::sync_channel(capacity);
            (EventSender::Bounded(tx), rx)
        }
        None => {
            let (tx, rx) = mpsc::channel();
            (EventSender::Unbounded(tx), rx)
        }
    }
}

/// The OS watcher, its watch set and the queue it feeds.
pub struct FileWatcher {
    tree: WatchTree<RecommendedWatcher>,
    event_rx: Receiver<NotifyResult>,
}

impl FileWatcher {
    /// Create the OS watcher and register every directory under `root`.
    pub fn new<P: AsRef<Path>>(root: P, config: &WatcherConfig) -> Result<Self> {
        let (tx, event_rx) = event_channel(config);

        let watcher = notify::recommended_watcher(tx)
            .context("Failed to create file system watcher")?;

        let mut tree = WatchTree::new(root, watcher);
        tree.initialize()?;

        Ok(Self { tree, event_rx })
    }

    pub fn tree(&self) -> &WatchTree<RecommendedWatcher> {
        &self.tree
    }

    pub fn into_parts(self) -> (WatchTree<RecommendedWatcher>, Receiver<NotifyResult>) {
        (self.tree, self.event_rx)
    }
}

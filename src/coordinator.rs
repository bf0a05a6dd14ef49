use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crate::{
    DirectoryWatcher, EventFilter, NotifyResult, RawEvent, SyncAction, SyncConfig, SyncOutcome,
    Transfer, WatchTree,
};

/// Counters for what the event loop has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub events: usize,
    pub ignored: usize,
    pub registered: usize,
    pub syncs: usize,
    pub failed_syncs: usize,
    pub watcher_errors: usize,
}

/// Single consumer of the notification queue.
///
/// Everything runs on the calling thread, one event at a time, so the watch
/// set needs no locking. A running transfer blocks the loop; notifications
/// arriving meanwhile wait in the queue.
pub struct Coordinator<W: DirectoryWatcher, T: Transfer> {
    config: Arc<SyncConfig>,
    tree: WatchTree<W>,
    filter: EventFilter,
    transfer: T,
    stats: LoopStats,
}

impl<W: DirectoryWatcher, T: Transfer> Coordinator<W, T> {
    pub fn new(config: Arc<SyncConfig>, tree: WatchTree<W>, transfer: T) -> Self {
        Self {
            config,
            tree,
            filter: EventFilter::new(),
            transfer,
            stats: LoopStats::default(),
        }
    }

    /// Classify one raw event, extend the watch set if it created a
    /// directory, and hand back the sync action if there is one.
    pub fn handle_event(&mut self, event: &RawEvent) -> Option<SyncAction> {
        self.stats.events += 1;
        tracing::debug!("{} {}", event.kinds, event.path.display());

        let classification = self.filter.classify(event);
        if classification.is_ignored() {
            self.stats.ignored += 1;
            return None;
        }

        if let Some(dir) = classification.register {
            if self.tree.register_new_directory(&dir) {
                self.stats.registered += 1;
            }
        }

        classification.sync
    }

    /// Classify an event and mirror the tree right away if it asks for it.
    pub fn process(&mut self, event: &RawEvent) -> Option<SyncOutcome> {
        let action = self.handle_event(event)?;
        Some(self.dispatch(&action))
    }

    /// Run until the queue disconnects. With the OS watcher alive that
    /// never happens.
    pub fn run(&mut self, events: Receiver<NotifyResult>) -> LoopStats {
        let window = self.config.watcher.coalesce_window();

        while let Ok(message) = events.recv() {
            let actions = match message {
                Ok(event) => self.handle_notify(event),
                Err(err) => {
                    self.watcher_error(err);
                    continue;
                }
            };

            match window {
                None => {
                    for action in &actions {
                        self.dispatch(action);
                    }
                }
                Some(window) if !actions.is_empty() => {
                    let (batch, disconnected) = self.collect_burst(&events, actions, window);
                    self.dispatch_batch(&batch);
                    if disconnected {
                        break;
                    }
                }
                Some(_) => {}
            }
        }

        tracing::info!("Event queue closed, stopping");
        self.stats
    }

    /// Keep classifying events until `window` has passed since the first
    /// sync action. Directories are still registered as they show up.
    fn collect_burst(
        &mut self,
        events: &Receiver<NotifyResult>,
        mut pending: Vec<SyncAction>,
        window: Duration,
    ) -> (Vec<SyncAction>, bool) {
        let deadline = Instant::now() + window;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return (pending, false);
            }
            match events.recv_timeout(remaining) {
                Ok(Ok(event)) => pending.extend(self.handle_notify(event)),
                Ok(Err(err)) => self.watcher_error(err),
                Err(RecvTimeoutError::Timeout) => return (pending, false),
                Err(RecvTimeoutError::Disconnected) => return (pending, true),
            }
        }
    }

    fn handle_notify(&mut self, event: notify::Event) -> Vec<SyncAction> {
        RawEvent::from_notify(event)
            .iter()
            .filter_map(|raw| self.handle_event(raw))
            .collect()
    }

    fn dispatch_batch(&mut self, batch: &[SyncAction]) {
        let Some(last) = batch.last() else {
            return;
        };
        if batch.len() > 1 {
            tracing::info!("Coalesced {} changes into one sync", batch.len());
        }
        self.dispatch(last);
    }

    fn dispatch(&mut self, action: &SyncAction) -> SyncOutcome {
        let outcome = self.transfer.sync(&action.path);
        self.stats.syncs += 1;
        if !outcome.is_success() {
            self.stats.failed_syncs += 1;
        }
        outcome
    }

    fn watcher_error(&mut self, err: notify::Error) {
        self.stats.watcher_errors += 1;
        tracing::error!("File watcher error: {}", err);
    }

    pub fn tree(&self) -> &WatchTree<W> {
        &self.tree
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }
}

/// Why the main thread stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Interrupted,
    EventLoopExited,
}

/// Sends `EventLoopExited` when dropped, which includes unwinding.
struct ExitSignal(Sender<Shutdown>);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.0.send(Shutdown::EventLoopExited);
    }
}

/// Run the coordinator on its own thread. `exited` hears about it when the
/// loop ends for any reason, panics included.
pub fn spawn_event_loop<W, T>(
    mut coordinator: Coordinator<W, T>,
    events: Receiver<NotifyResult>,
    exited: Sender<Shutdown>,
) -> std::io::Result<JoinHandle<LoopStats>>
where
    W: DirectoryWatcher + Send + 'static,
    T: Transfer + Send + 'static,
{
    thread::Builder::new()
        .name("filesync-events".to_string())
        .spawn(move || {
            let _signal = ExitSignal(exited);
            coordinator.run(events)
        })
}

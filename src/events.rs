use std::fmt;
use std::path::PathBuf;
use notify::event::{EventKind, ModifyKind};

/// Set of change kinds carried by a single raw filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChangeKinds(u8);

impl ChangeKinds {
    pub const NONE: ChangeKinds = ChangeKinds(0);
    pub const CREATE: ChangeKinds = ChangeKinds(1 << 0);
    pub const WRITE: ChangeKinds = ChangeKinds(1 << 1);
    pub const RENAME: ChangeKinds = ChangeKinds(1 << 2);
    pub const REMOVE: ChangeKinds = ChangeKinds(1 << 3);
    pub const CHMOD: ChangeKinds = ChangeKinds(1 << 4);

    /// Kinds that require the tree to be mirrored
    pub const SYNC_WORTHY: ChangeKinds =
        ChangeKinds(Self::CREATE.0 | Self::WRITE.0 | Self::RENAME.0 | Self::REMOVE.0);

    pub fn contains(self, other: ChangeKinds) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: ChangeKinds) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_sync_worthy(self) -> bool {
        self.intersects(Self::SYNC_WORTHY)
    }
}

impl std::ops::BitOr for ChangeKinds {
    type Output = ChangeKinds;

    fn bitor(self, rhs: ChangeKinds) -> ChangeKinds {
        ChangeKinds(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ChangeKinds {
    fn bitor_assign(&mut self, rhs: ChangeKinds) {
        self.0 |= rhs.0;
    }
}

impl From<&EventKind> for ChangeKinds {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => ChangeKinds::CREATE,
            EventKind::Modify(ModifyKind::Name(_)) => ChangeKinds::RENAME,
            EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKinds::CHMOD,
            EventKind::Modify(_) => ChangeKinds::WRITE,
            EventKind::Remove(_) => ChangeKinds::REMOVE,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => ChangeKinds::NONE,
        }
    }
}

impl fmt::Display for ChangeKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (ChangeKinds::CREATE, "CREATE"),
            (ChangeKinds::WRITE, "WRITE"),
            (ChangeKinds::RENAME, "RENAME"),
            (ChangeKinds::REMOVE, "REMOVE"),
            (ChangeKinds::CHMOD, "CHMOD"),
        ];
        let parts: Vec<&str> = names
            .iter()
            .filter(|(kind, _)| self.contains(*kind))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", parts.join("|"))
    }
}

/// A single filesystem notification for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kinds: ChangeKinds,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kinds: ChangeKinds) -> Self {
        Self {
            path: path.into(),
            kinds,
        }
    }

    /// Split a notify event into one raw event per affected path.
    /// Events with no relevant kind produce nothing.
    pub fn from_notify(event: notify::Event) -> Vec<RawEvent> {
        let kinds = ChangeKinds::from(&event.kind);
        if kinds.is_empty() {
            return Vec::new();
        }
        event
            .paths
            .into_iter()
            .map(|path| RawEvent::new(path, kinds))
            .collect()
    }
}

/// An absolute path whose change requires mirroring the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAction {
    pub path: PathBuf,
}

/// Outcome of classifying one raw event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub sync: Option<SyncAction>,
    pub register: Option<PathBuf>,
}

impl Classification {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn is_ignored(&self) -> bool {
        self.sync.is_none() && self.register.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};

    #[test]
    fn test_change_kinds_from_notify() {
        assert_eq!(ChangeKinds::from(&EventKind::Create(CreateKind::File)), ChangeKinds::CREATE);
        assert_eq!(
            ChangeKinds::from(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            ChangeKinds::WRITE
        );
        assert_eq!(
            ChangeKinds::from(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            ChangeKinds::RENAME
        );
        assert_eq!(
            ChangeKinds::from(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))),
            ChangeKinds::CHMOD
        );
        assert_eq!(ChangeKinds::from(&EventKind::Remove(RemoveKind::Folder)), ChangeKinds::REMOVE);
        assert!(ChangeKinds::from(&EventKind::Any).is_empty());
    }

    #[test]
    fn test_sync_worthy_kinds() {
        assert!(ChangeKinds::CREATE.is_sync_worthy());
        assert!((ChangeKinds::WRITE | ChangeKinds::CHMOD).is_sync_worthy());
        assert!(!ChangeKinds::CHMOD.is_sync_worthy());
        assert!(!ChangeKinds::NONE.is_sync_worthy());
    }

    #[test]
    fn test_from_notify_splits_paths() {
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/work/old.txt"))
            .add_path(PathBuf::from("/work/new.txt"));

        let raw = RawEvent::from_notify(event);
        assert_eq!(
            raw,
            vec![
                RawEvent::new("/work/old.txt", ChangeKinds::RENAME),
                RawEvent::new("/work/new.txt", ChangeKinds::RENAME),
            ]
        );
    }

    #[test]
    fn test_from_notify_drops_access() {
        let event = notify::Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/work/a.txt"));
        assert!(RawEvent::from_notify(event).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!((ChangeKinds::CREATE | ChangeKinds::WRITE).to_string(), "CREATE|WRITE");
    }
}

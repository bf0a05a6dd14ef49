use std::path::Path;
use crate::SyncConfig;

/// Strip `root` from `path` and return the remainder with exactly one leading `/`.
///
/// This is a string transform, not a containment check: a path outside of
/// `root` is returned unchanged apart from the separator normalization.
pub fn relative_to_root<R: AsRef<Path>, P: AsRef<Path>>(root: R, path: P) -> String {
    let root = root.as_ref().to_string_lossy();
    let path = path.as_ref().to_string_lossy();

    let remaining = path.strip_prefix(root.as_ref()).unwrap_or(&path);
    format!("/{}", remaining.trim_start_matches('/'))
}

/// Remote location a changed path maps to, `<folder><relative path>`.
pub fn destination_for<P: AsRef<Path>>(config: &SyncConfig, path: P) -> String {
    let folder = config.destination.folder.trim_end_matches('/');
    format!("{}{}", folder, relative_to_root(&config.root_path, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::{Destination, SyncConfig};

    #[test]
    fn test_file_under_root() {
        assert_eq!(relative_to_root("/work", "/work/a.txt"), "/a.txt");
        assert_eq!(relative_to_root("/work", "/work/sub/b.txt"), "/sub/b.txt");
    }

    #[test]
    fn test_root_itself_maps_to_separator() {
        assert_eq!(relative_to_root("/work", "/work"), "/");
    }

    #[test]
    fn test_root_with_trailing_separator() {
        assert_eq!(relative_to_root("/work/", "/work/a.txt"), "/a.txt");
    }

    #[test]
    fn test_duplicate_leading_separators_collapse() {
        assert_eq!(relative_to_root("/work", "/work//a.txt"), "/a.txt");
    }

    #[test]
    fn test_path_outside_root_is_kept() {
        assert_eq!(relative_to_root("/work", "/other/a.txt"), "/other/a.txt");
    }

    #[test]
    fn test_single_leading_separator_for_many_paths() {
        let root = "/home/dev/project";
        for p in ["/home/dev/project/x", "/home/dev/project/a/b/c.rs", "/home/dev/project/.git/HEAD"] {
            let rel = relative_to_root(root, p);
            assert!(rel.starts_with('/'));
            assert!(!rel.starts_with("//"));
            assert_eq!(format!("{}{}", root, rel), p);
        }
    }

    #[test]
    fn test_destination_for_joins_folder() {
        let config = SyncConfig::new(
            PathBuf::from("/work"),
            Destination::new("devbox", "/srv/work/"),
            false,
        );
        assert_eq!(destination_for(&config, "/work/a.txt"), "/srv/work/a.txt");
    }
}

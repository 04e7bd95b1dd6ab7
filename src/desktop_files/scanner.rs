//! Initial population of the cache from the configured directories.

use crate::desktop_files::cache::DesktopFileCache;
use std::fs;
use std::path::{Path, PathBuf};

/// Load every direct child of each directory into `cache`.
///
/// Subdirectories are not descended into; the watcher picks up nested
/// changes later. A directory that cannot be read is logged and skipped.
/// Returns the number of paths handed to the cache.
pub fn scan<P: AsRef<Path>>(cache: &mut DesktopFileCache, directories: &[P]) -> usize {
    let mut visited = 0;

    for dir in directories {
        let dir = dir.as_ref();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read directory {}: {}", dir.display(), e);
                continue;
            }
        };

        // Sorted so records are inserted in a stable order.
        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        paths.sort();

        for path in &paths {
            cache.load(path);
        }
        visited += paths.len();
        tracing::debug!("Scanned {} entries in {}", paths.len(), dir.display());
    }

    tracing::info!("Initial scan loaded {} records", cache.len());
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::desktop_files::context::StaticContextRegistry;
    use std::rc::Rc;
    use tempfile::tempdir;

    const ENTRY: &str = "[Desktop Entry]\nName=Terminal\nExec=xterm\n";

    fn cache() -> DesktopFileCache {
        let (cache, _rx) = DesktopFileCache::new(
            &CacheConfig::default(),
            Rc::new(StaticContextRegistry::new()),
        );
        cache
    }

    #[test]
    fn test_scan_loads_entry_files() {
        let user = tempdir().unwrap();
        let system = tempdir().unwrap();
        fs::write(user.path().join("b.desktop"), ENTRY).unwrap();
        fs::write(user.path().join("a.desktop"), ENTRY).unwrap();
        fs::write(user.path().join("notes.txt"), "hello").unwrap();
        fs::write(system.path().join("c.desktop"), ENTRY).unwrap();

        let mut cache = cache();
        let visited = scan(&mut cache, &[user.path(), system.path()]);

        assert_eq!(visited, 4);
        let names: Vec<_> = cache.records().map(|r| r.logical_name().to_string()).collect();
        assert_eq!(names, vec!["a.desktop", "b.desktop", "c.desktop"]);
    }

    #[test]
    fn test_scan_is_not_recursive() {
        let root = tempdir().unwrap();
        let nested = root.path().join("kde4");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("konsole.desktop"), ENTRY).unwrap();

        let mut cache = cache();
        scan(&mut cache, &[root.path()]);

        assert!(cache.is_empty());
    }

    #[test]
    fn test_scan_skips_missing_directory() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("a.desktop"), ENTRY).unwrap();
        let missing = root.path().join("does-not-exist");

        let mut cache = cache();
        let visited = scan(&mut cache, &[missing.as_path(), root.path()]);

        assert_eq!(visited, 1);
        assert_eq!(cache.len(), 1);
    }
}

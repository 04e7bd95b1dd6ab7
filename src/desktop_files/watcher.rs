//! Filesystem notification transport for entry directories.
//!
//! Wraps `notify` and turns its raw events into [`FileChangeEvent`]s on a
//! tokio channel. Directories where native watching fails (NFS, some FUSE
//! mounts) fall back to polling.

use notify::{
    event::{ModifyKind, RenameMode},
    Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur in the file watcher system.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// The polling watcher could not be created.
    #[error("Failed to create watcher: {0}")]
    WatcherCreation(#[from] notify::Error),

    /// Neither watcher accepted the directory.
    #[error("Failed to watch path {path}: {source}")]
    WatchPath {
        /// Directory that could not be watched.
        path: PathBuf,
        /// Error from the polling watcher.
        source: notify::Error,
    },
}

/// Kinds of change the cache reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeKind {
    /// A file appeared.
    Created,
    /// A file's contents changed.
    Modified,
    /// A file disappeared.
    Removed,
}

/// A single change to a path under a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    /// Affected path.
    pub path: PathBuf,
    /// What happened to it.
    pub kind: FileChangeKind,
}

impl FileChangeEvent {
    /// Create an event.
    pub fn new(path: impl Into<PathBuf>, kind: FileChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Convert a raw notify event into zero or more change events.
///
/// Renames become a removal of the old path and a creation of the new one.
/// Access and unclassified events are dropped.
pub fn events_from_notify(event: Event) -> Vec<FileChangeEvent> {
    let single = |kind: FileChangeKind| -> Vec<FileChangeEvent> {
        event
            .paths
            .iter()
            .map(|path| FileChangeEvent::new(path.clone(), kind))
            .collect()
    };

    match event.kind {
        EventKind::Create(_) => single(FileChangeKind::Created),
        EventKind::Remove(_) => single(FileChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => single(FileChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => single(FileChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => vec![
                FileChangeEvent::new(from.clone(), FileChangeKind::Removed),
                FileChangeEvent::new(to.clone(), FileChangeKind::Created),
            ],
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|path| {
                // Direction unknown: the filesystem tells us which side we saw.
                let kind = if path.exists() {
                    FileChangeKind::Created
                } else {
                    FileChangeKind::Removed
                };
                FileChangeEvent::new(path.clone(), kind)
            })
            .collect(),
        EventKind::Modify(_) => single(FileChangeKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// Recursive watcher over the entry directories.
///
/// Events are delivered on the receiver returned by [`DesktopFileWatcher::new`].
/// Dropping the watcher stops delivery and closes the channel.
pub struct DesktopFileWatcher {
    native_watcher: Option<RecommendedWatcher>,
    poll_watcher: PollWatcher,
    use_polling_for: HashSet<PathBuf>,
}

impl DesktopFileWatcher {
    /// Creates a new watcher.
    ///
    /// # Arguments
    /// * `poll_interval_ms` - Interval for the polling fallback (recommended: 1000-2000ms)
    ///
    /// # Returns
    /// A tuple of (watcher, receiver) where receiver gets change events.
    pub fn new(
        poll_interval_ms: u64,
    ) -> Result<(Self, mpsc::UnboundedReceiver<FileChangeEvent>), WatcherError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let poll_tx = tx.clone();

        let native_watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| forward(&tx, res),
            Config::default(),
        )
        .map_err(|e| tracing::warn!("Native watcher unavailable, polling only: {}", e))
        .ok();

        let poll_config = Config::default()
            .with_poll_interval(Duration::from_millis(poll_interval_ms))
            .with_compare_contents(false);

        let poll_watcher = PollWatcher::new(
            move |res: Result<Event, notify::Error>| forward(&poll_tx, res),
            poll_config,
        )?;

        Ok((
            Self {
                native_watcher,
                poll_watcher,
                use_polling_for: HashSet::new(),
            },
            rx,
        ))
    }

    /// Watch a directory recursively, natively if possible, polling otherwise.
    pub fn watch(&mut self, path: &Path) -> Result<(), WatcherError> {
        if let Some(ref mut native) = self.native_watcher {
            match native.watch(path, RecursiveMode::Recursive) {
                Ok(()) => {
                    tracing::debug!("Using native watcher for {}", path.display());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        "Native watcher failed for {}: {}, falling back to polling",
                        path.display(),
                        e
                    );
                }
            }
        }

        tracing::debug!("Using poll watcher for {}", path.display());
        self.poll_watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(|e| WatcherError::WatchPath {
                path: path.to_path_buf(),
                source: e,
            })?;
        self.use_polling_for.insert(path.to_path_buf());
        Ok(())
    }

    /// Watch every directory, logging and skipping the ones that fail.
    ///
    /// Returns how many directories are being watched.
    pub fn watch_all<P: AsRef<Path>>(&mut self, directories: &[P]) -> usize {
        let mut watched = 0;
        for dir in directories {
            let dir = dir.as_ref();
            if !dir.is_dir() {
                tracing::warn!("Not watching {}: not a directory", dir.display());
                continue;
            }
            match self.watch(dir) {
                Ok(()) => watched += 1,
                Err(e) => tracing::warn!("{}", e),
            }
        }
        watched
    }

    /// Check if a path is using polling fallback.
    pub fn is_using_polling(&self, path: &Path) -> bool {
        self.use_polling_for.contains(path)
    }
}

impl std::fmt::Debug for DesktopFileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopFileWatcher")
            .field("native", &self.native_watcher.is_some())
            .field("use_polling_for", &self.use_polling_for)
            .finish()
    }
}

fn forward(tx: &mpsc::UnboundedSender<FileChangeEvent>, res: Result<Event, notify::Error>) {
    match res {
        Ok(event) => {
            for change in events_from_notify(event) {
                // Receiver gone means the loop has shut down.
                let _ = tx.send(change);
            }
        }
        Err(e) => tracing::warn!("Watch error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};
    use std::fs;
    use tempfile::tempdir;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(*path)))
    }

    #[test]
    fn test_create_modify_remove() {
        let created = events_from_notify(event(EventKind::Create(CreateKind::File), &["/a.desktop"]));
        assert_eq!(created, vec![FileChangeEvent::new("/a.desktop", FileChangeKind::Created)]);

        let modified = events_from_notify(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/a.desktop"],
        ));
        assert_eq!(modified[0].kind, FileChangeKind::Modified);

        let removed = events_from_notify(event(EventKind::Remove(RemoveKind::File), &["/a.desktop"]));
        assert_eq!(removed[0].kind, FileChangeKind::Removed);
    }

    #[test]
    fn test_rename_both_splits_into_remove_and_create() {
        let events = events_from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/a.desktop.tmp", "/a.desktop"],
        ));

        assert_eq!(
            events,
            vec![
                FileChangeEvent::new("/a.desktop.tmp", FileChangeKind::Removed),
                FileChangeEvent::new("/a.desktop", FileChangeKind::Created),
            ]
        );
    }

    #[test]
    fn test_rename_halves() {
        let from = events_from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/old.desktop"],
        ));
        let to = events_from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/new.desktop"],
        ));

        assert_eq!(from[0].kind, FileChangeKind::Removed);
        assert_eq!(to[0].kind, FileChangeKind::Created);
    }

    #[test]
    fn test_rename_of_unknown_direction_checks_filesystem() {
        let temp = tempdir().unwrap();
        let present = temp.path().join("present.desktop");
        let gone = temp.path().join("gone.desktop");
        fs::write(&present, "[Desktop Entry]\n").unwrap();

        let raw = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(present.clone())
            .add_path(gone.clone());

        assert_eq!(
            events_from_notify(raw),
            vec![
                FileChangeEvent::new(present, FileChangeKind::Created),
                FileChangeEvent::new(gone, FileChangeKind::Removed),
            ]
        );
    }

    #[test]
    fn test_access_events_are_dropped() {
        let events = events_from_notify(event(
            EventKind::Access(AccessKind::Read),
            &["/a.desktop"],
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn test_watch_all_skips_missing_directories() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("missing");

        let (mut watcher, _rx) = DesktopFileWatcher::new(1000).unwrap();
        let watched = watcher.watch_all(&[temp.path(), missing.as_path()]);

        assert_eq!(watched, 1);
    }

    #[tokio::test]
    async fn test_delivers_created_file() {
        let temp = tempdir().unwrap();
        let (mut watcher, mut rx) = DesktopFileWatcher::new(100).unwrap();
        watcher.watch(temp.path()).unwrap();

        let path = temp.path().join("new.desktop");
        fs::write(&path, "[Desktop Entry]\n").unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = rx.recv().await {
                if event.path.file_name() == path.file_name() {
                    return Some(event);
                }
            }
            None
        })
        .await
        .ok()
        .flatten();

        assert!(received.is_some());
    }
}

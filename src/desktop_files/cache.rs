//! Cache of entry records, one per entry file path.
//!
//! The cache is the single place where filesystem state is reconciled with
//! the in-memory catalog. Both the startup scan and live change events go
//! through [`DesktopFileCache::load`] and [`DesktopFileCache::remove`].

use crate::config::CacheConfig;
use crate::desktop_files::context::ContextRegistry;
use crate::desktop_files::eligibility::is_eligible;
use crate::desktop_files::entry::{DesktopEntryParser, EntryParser};
use crate::desktop_files::record::EntryRecord;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tokio::sync::broadcast;

/// File name suffix of entry files.
pub const ENTRY_SUFFIX: &str = ".desktop";

/// Callback run once for every newly created record.
pub type Observer = Box<dyn FnMut(&mut EntryRecord)>;

/// Change notification published for every cache mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A record was created.
    Created(PathBuf),
    /// An existing record changed.
    Updated(PathBuf),
    /// A record was removed.
    Removed(PathBuf),
}

/// What a call to [`DesktopFileCache::load`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing changed: missing, empty or non-entry file, or a rejected file
    /// that was not cached anyway.
    Ignored,
    /// A new record was created and observers were run.
    Created,
    /// An existing record was reloaded and changed.
    Updated,
    /// An existing record was reloaded with identical data.
    Unchanged,
    /// The file failed to parse or became ineligible and its record was dropped.
    Removed,
}

/// Counters for debugging and monitoring.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls to `load`.
    pub total_loads: u64,
    /// Records created.
    pub total_creates: u64,
    /// Reloads that changed a record.
    pub total_updates: u64,
    /// Records removed.
    pub total_removes: u64,
    /// Files that failed to parse.
    pub parse_failures: u64,
    /// Files rejected by the visibility rules.
    pub ineligible: u64,
}

/// Live catalog of launchers built from entry files.
///
/// Records are mutated in place on reload, so a record's identity (and the
/// dependents it tracks) survives edits of its file. Observers only ever see
/// `&mut EntryRecord`, never the cache, so they cannot re-enter `load` or
/// `remove` while the cache is iterating.
pub struct DesktopFileCache {
    records: IndexMap<PathBuf, EntryRecord>,
    observers: Vec<Observer>,
    parser: Box<dyn EntryParser>,
    contexts: Rc<dyn ContextRegistry>,
    current_environments: Vec<String>,
    events: broadcast::Sender<CacheEvent>,
    stats: CacheStats,
}

impl DesktopFileCache {
    /// Creates an empty cache reading `.desktop` files.
    ///
    /// # Returns
    /// A tuple of (cache, receiver) where receiver gets [`CacheEvent`]s.
    pub fn new(
        config: &CacheConfig,
        contexts: Rc<dyn ContextRegistry>,
    ) -> (Self, broadcast::Receiver<CacheEvent>) {
        let (events, receiver) = broadcast::channel(config.event_buffer.max(1));

        (
            Self {
                records: IndexMap::new(),
                observers: Vec::new(),
                parser: Box::new(DesktopEntryParser),
                contexts,
                current_environments: config.current_environments.clone(),
                events,
                stats: CacheStats::default(),
            },
            receiver,
        )
    }

    /// Replace the entry parser.
    pub fn with_parser(mut self, parser: impl EntryParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Load or reload the entry file at `path`.
    ///
    /// Missing and zero-length files are ignored, since change events race
    /// with file creation and deletion. A file that fails to parse or is not
    /// eligible in the current environment has its record removed. Observers
    /// run only when a new record is created.
    pub fn load(&mut self, path: &Path) -> LoadOutcome {
        self.stats.total_loads += 1;

        match fs::metadata(path) {
            Ok(metadata) if metadata.len() > 0 => {}
            _ => {
                tracing::trace!("Skipping missing or empty file {}", path.display());
                return LoadOutcome::Ignored;
            }
        }

        if !has_entry_suffix(path) {
            return LoadOutcome::Ignored;
        }

        let entry = match self.parser.parse(path) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot load desktop entry file {}: {}", path.display(), e);
                self.stats.parse_failures += 1;
                return self.reject(path);
            }
        };

        if !is_eligible(&entry, self.current_environments.as_slice()) {
            tracing::debug!("Entry {} is not shown in this environment", path.display());
            self.stats.ineligible += 1;
            return self.reject(path);
        }

        let is_new = !self.records.contains_key(path);
        let record = self
            .records
            .entry(path.to_path_buf())
            .or_insert_with(|| EntryRecord::new(path.to_path_buf()));

        let changed = record.refresh(&entry, self.contexts.as_ref());
        record.refresh_dependents();

        if is_new {
            for observer in self.observers.iter_mut() {
                observer(record);
            }
            self.stats.total_creates += 1;
            tracing::debug!("Loaded {}", path.display());
            self.publish(CacheEvent::Created(path.to_path_buf()));
            LoadOutcome::Created
        } else if changed {
            self.stats.total_updates += 1;
            tracing::debug!("Reloaded {}", path.display());
            self.publish(CacheEvent::Updated(path.to_path_buf()));
            LoadOutcome::Updated
        } else {
            LoadOutcome::Unchanged
        }
    }

    /// Remove the record for `path`, detaching all of its dependents.
    ///
    /// Returns whether a record was present. Observers are not called.
    pub fn remove(&mut self, path: &Path) -> bool {
        let Some(mut record) = self.records.shift_remove(path) else {
            return false;
        };

        record.detach_dependents();
        self.stats.total_removes += 1;
        tracing::debug!("Removed {}", path.display());
        self.publish(CacheEvent::Removed(path.to_path_buf()));
        true
    }

    /// Register an observer for newly created records.
    ///
    /// The observer is immediately run for every record already cached, in
    /// insertion order, so late registration still sees the full catalog.
    /// Observers that create UI elements should attach them with
    /// [`EntryRecord::add_dependent`].
    pub fn register_callback<F>(&mut self, observer: F)
    where
        F: FnMut(&mut EntryRecord) + 'static,
    {
        let mut observer: Observer = Box::new(observer);
        for record in self.records.values_mut() {
            observer(record);
        }
        self.observers.push(observer);
    }

    /// Iterate over all records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &EntryRecord> + '_ {
        self.records.values()
    }

    /// Get the record for `path`.
    pub fn get(&self, path: &Path) -> Option<&EntryRecord> {
        self.records.get(path)
    }

    /// Check if `path` has a record.
    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Environment names used by the visibility rules.
    pub fn current_environments(&self) -> &[String] {
        &self.current_environments
    }

    /// Subscribe to [`CacheEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn reject(&mut self, path: &Path) -> LoadOutcome {
        if self.remove(path) {
            LoadOutcome::Removed
        } else {
            LoadOutcome::Ignored
        }
    }

    fn publish(&self, event: CacheEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for DesktopFileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopFileCache")
            .field("records", &self.records.len())
            .field("observers", &self.observers.len())
            .field("current_environments", &self.current_environments)
            .field("stats", &self.stats)
            .finish()
    }
}

fn has_entry_suffix(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.as_encoded_bytes().ends_with(ENTRY_SUFFIX.as_bytes()))
}

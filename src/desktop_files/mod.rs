//! Desktop entry cache.
//!
//! This module provides:
//! - `entry`: parsing of `.desktop` files
//! - `eligibility`: visibility rules for the current desktop environment
//! - `context`: lookup of the contexts entries are bound to
//! - `record`: the cached per-file record and its dependent UI elements
//! - `cache`: the path-keyed record cache
//! - `scanner`: initial population from the configured directories
//! - `watcher`: filesystem notification transport
//! - `router`: forwarding of change events into the cache

pub mod cache;
pub mod context;
pub mod eligibility;
pub mod entry;
pub mod record;
pub mod router;
pub mod scanner;
pub mod watcher;

pub use cache::{CacheEvent, CacheStats, DesktopFileCache, LoadOutcome, Observer, ENTRY_SUFFIX};
pub use context::{ContextHandle, ContextRegistry, StaticContextRegistry};
pub use eligibility::is_eligible;
pub use entry::{DesktopEntryParser, EntryParser, ParseError, ParsedEntry};
pub use record::{DependentEntry, EntryContainer, EntryKey, EntryRecord, DISPOSABLE_PREFIX};
pub use router::{route_event, run_event_loop};
pub use scanner::scan;
pub use watcher::{
    events_from_notify, DesktopFileWatcher, FileChangeEvent, FileChangeKind, WatcherError,
};

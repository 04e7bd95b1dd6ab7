//! Desktop File Cache
//!
//! This crate keeps a live in-memory catalog of application launchers built
//! from `.desktop` entry files, consistent with the filesystem as files are
//! created, edited and deleted, and tells interested UI layers (menus,
//! search indexes) about new launchers.
//!
//! ## Guarantees
//!
//! - **One record per path**: the entry file path is the only identity key.
//! - **Stable identity**: reloading a file updates its record in place, so
//!   menu rows attached to it stay valid.
//! - **Create-once callbacks**: observers run exactly once per new record,
//!   in registration order.
//! - **Noise tolerance**: missing, empty, unparsable or hidden files simply
//!   have no record; nothing is surfaced as an error.
//!
//! ## Flow
//!
//! ```text
//! scan(directories)          DesktopFileWatcher (notify)
//!        ↓                            ↓
//!        ↓                   FileChangeEvent (mpsc)
//!        ↓                            ↓
//!        ↓                   run_event_loop → route_event
//!        ↓                            ↓
//!        └──────→ DesktopFileCache::load / remove ←──┘
//!                            ↓
//!        observers (create only) + CacheEvent (broadcast)
//!                            ↓
//!              MenuList rows refresh / detach
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use desktop_file_cache::{
//!     config::CacheConfig,
//!     desktop_files::{scan, run_event_loop, DesktopFileCache, DesktopFileWatcher, StaticContextRegistry},
//!     ui::MenuList,
//! };
//! use std::rc::Rc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CacheConfig::from_env();
//!     let (mut cache, _events) =
//!         DesktopFileCache::new(&config, Rc::new(StaticContextRegistry::new()));
//!
//!     let menu = MenuList::new();
//!     let rows = menu.clone();
//!     cache.register_callback(move |record| {
//!         rows.append_for(record);
//!     });
//!
//!     scan(&mut cache, &config.directories);
//!
//!     let (mut watcher, mut changes) = DesktopFileWatcher::new(1000)?;
//!     watcher.watch_all(&config.directories);
//!     run_event_loop(&mut cache, &mut changes, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`config`]: directories and current desktop environments
//! - [`desktop_files`]: parsing, visibility rules, the record cache, scanning and watching
//! - [`ui`]: headless menu rows that depend on cache records

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod desktop_files;
pub mod ui;

/// Re-exports for convenience.
pub mod prelude {
    pub use crate::config::{CacheConfig, CacheConfigBuilder};
    pub use crate::desktop_files::{
        run_event_loop, scan, CacheEvent, ContextHandle, ContextRegistry, DependentEntry,
        DesktopFileCache, DesktopFileWatcher, EntryContainer, EntryKey, EntryRecord,
        FileChangeEvent, FileChangeKind, LoadOutcome, StaticContextRegistry, WatcherError,
    };
    pub use crate::ui::{MenuEntry, MenuList, MenuListBuilder};
}

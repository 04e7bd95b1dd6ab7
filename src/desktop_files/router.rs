//! Routing of filesystem change events into the cache.
//!
//! The router does no filtering or deduplication of its own; tolerance for
//! half-written or vanished files lives in [`DesktopFileCache::load`].

use crate::desktop_files::cache::DesktopFileCache;
use crate::desktop_files::watcher::{FileChangeEvent, FileChangeKind};
use std::future::Future;
use tokio::sync::mpsc;

/// Apply a single change event to the cache.
pub fn route_event(cache: &mut DesktopFileCache, event: &FileChangeEvent) {
    tracing::trace!("{:?}: {}", event.kind, event.path.display());
    match event.kind {
        FileChangeKind::Created | FileChangeKind::Modified => {
            cache.load(&event.path);
        }
        FileChangeKind::Removed => {
            cache.remove(&event.path);
        }
    }
}

/// Run the event loop until the channel closes or `shutdown` resolves.
///
/// Each event is applied to completion before the next one is received, so
/// the cache is only ever touched from this one task. Returns the number of
/// events handled.
pub async fn run_event_loop<F>(
    cache: &mut DesktopFileCache,
    events: &mut mpsc::UnboundedReceiver<FileChangeEvent>,
    shutdown: F,
) -> usize
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut handled = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested, stopping event loop");
                break;
            }
            event = events.recv() => {
                match event {
                    Some(event) => {
                        route_event(cache, &event);
                        handled += 1;
                    }
                    None => {
                        tracing::info!("Change event channel closed, stopping event loop");
                        break;
                    }
                }
            }
        }
    }

    handled
}

//! Demo application for the desktop file cache.
//!
//! Scans the entry directories, builds a headless menu from them and keeps
//! it up to date until Ctrl+C, printing what changes along the way.

use anyhow::Result;
use clap::Parser;
use desktop_file_cache::{
    config::{CacheConfig, CacheConfigBuilder},
    desktop_files::CacheEvent,
    prelude::*,
};
use std::path::PathBuf;
use std::rc::Rc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(about = "Watch .desktop entries and keep a launcher menu in sync")]
struct Args {
    /// Entry directory to scan and watch (repeatable). Defaults to the XDG directories.
    #[arg(long = "dir")]
    dirs: Vec<PathBuf>,

    /// Current desktop environment name (repeatable). Defaults to $XDG_CURRENT_DESKTOP.
    #[arg(long = "desktop")]
    desktops: Vec<String>,

    /// Known context, as NAME or NAME=ICON (repeatable).
    #[arg(long = "context", value_parser = parse_context)]
    contexts: Vec<ContextHandle>,

    /// Polling interval for directories that cannot be watched natively.
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,
}

fn parse_context(raw: &str) -> Result<ContextHandle, String> {
    let (name, icon) = match raw.split_once('=') {
        Some((name, icon)) => (name, Some(icon.to_string())),
        None => (raw, None),
    };
    if name.is_empty() {
        return Err("context name must not be empty".to_string());
    }
    Ok(ContextHandle::new(name, icon))
}

fn build_config(args: &Args) -> CacheConfig {
    let defaults = CacheConfig::from_env();
    let dirs = if args.dirs.is_empty() {
        defaults.directories
    } else {
        args.dirs.clone()
    };
    let desktops = if args.desktops.is_empty() {
        defaults.current_environments
    } else {
        args.desktops.clone()
    };

    CacheConfigBuilder::new()
        .directories(dirs)
        .environments(desktops)
        .build()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("desktop_file_cache=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args);

    println!("=== Desktop File Cache Demo ===\n");
    for dir in &config.directories {
        println!("Watching: {}", dir.display());
    }
    println!("Environments: {:?}\n", config.current_environments);

    let contexts: Rc<StaticContextRegistry> = Rc::new(args.contexts.into_iter().collect());
    let (mut cache, mut cache_rx) = DesktopFileCache::new(&config, contexts);

    let menu = MenuListBuilder::new()
        .on_invalidate(Box::new(|visible| {
            println!("[Menu] {} launchers visible", visible);
        }))
        .build();
    let rows = menu.clone();
    cache.register_callback(move |record| {
        rows.append_for(record);
    });

    scan(&mut cache, &config.directories);
    println!("\nLoaded {} launchers\n", cache.len());

    let (mut watcher, mut changes) = DesktopFileWatcher::new(args.poll_interval_ms)?;
    watcher.watch_all(&config.directories);
    for dir in &config.directories {
        if watcher.is_using_polling(dir) {
            println!("Note: Using polling fallback for {}", dir.display());
        }
    }

    // Print cache events as they happen.
    tokio::spawn(async move {
        loop {
            match cache_rx.recv().await {
                Ok(CacheEvent::Created(path)) => println!("[Cache] + {}", path.display()),
                Ok(CacheEvent::Updated(path)) => println!("[Cache] ~ {}", path.display()),
                Ok(CacheEvent::Removed(path)) => println!("[Cache] - {}", path.display()),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    tracing::warn!("Event printer lagged behind by {} events", count);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("Press Ctrl+C to exit\n");
    println!("Try creating, editing or deleting .desktop files in the watched directories.\n");
    println!("---\n");

    let handled = run_event_loop(&mut cache, &mut changes, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        println!("\nShutting down...");
    })
    .await;

    println!("Handled {} change events", handled);
    for label in menu.visible_labels() {
        println!("  {}", label);
    }
    println!("Done!");

    Ok(())
}

// src/watcher/mod.rs

//! The background task that polls the emulator and drives the bound game handler.

pub mod game_loop;
pub mod host;

pub use game_loop::{GameWatcher, TickOutcome, WatcherHandle};
pub use host::{DetachedHost, HostMessage, HostSession};

use crate::config::Config;
use crate::core::handler::{HandlerRegistry, Session};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Builds a watcher from `config` and runs it on a new task.
pub fn spawn(
    config: &Config,
    registry: Arc<HandlerRegistry>,
    host: Box<dyn HostSession>,
) -> (JoinHandle<()>, WatcherHandle) {
    let session = Session::new(config.client(), config.watcher_interval);
    let (watcher, handle) = GameWatcher::new(session, registry, host);
    let watcher = watcher.with_expected_version(config.expected_version.clone());
    (tokio::spawn(watcher.run()), handle)
}

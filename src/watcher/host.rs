// src/watcher/host.rs

//! The boundary between the watcher loop and the host application that owns
//! the upstream server link.

use crate::core::handler::Session;
use async_trait::async_trait;
use serde_json::Value;

/// A message the host received from its upstream server, forwarded to the bound handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HostMessage {
    pub cmd: String,
    pub args: Value,
}

impl HostMessage {
    pub fn new(cmd: impl Into<String>, args: Value) -> Self {
        Self {
            cmd: cmd.into(),
            args,
        }
    }
}

/// What the watcher needs from the host application.
#[async_trait]
pub trait HostSession: Send {
    /// Returns true while the host holds a live link to its upstream server.
    fn is_linked(&self) -> bool;

    /// Drops the upstream link. Called when different content is loaded.
    async fn drop_link(&mut self);

    /// Starts authenticating upstream with what the session holds. If
    /// `session.auth` is still unset the host is expected to ask the player.
    async fn authenticate(&mut self, session: &Session);
}

/// A host with no upstream server. Used when the client runs on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedHost;

#[async_trait]
impl HostSession for DetachedHost {
    fn is_linked(&self) -> bool {
        false
    }

    async fn drop_link(&mut self) {}

    async fn authenticate(&mut self, _session: &Session) {}
}

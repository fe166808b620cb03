// src/core/handler/mod.rs

//! Game-specific handlers and the registry that selects one for the loaded content.

pub mod registry;
pub mod session;

pub use registry::{BoundHandler, HandlerRegistry};
pub use session::{AuthStatus, Session};

use crate::core::RetroLinkError;
use async_trait::async_trait;
use serde_json::Value;

/// The contract every game handler implements.
///
/// A handler is only ever asked about content running on one of the systems
/// it was registered for, so it does not need to check the system itself.
#[async_trait]
pub trait GameHandler: Send + Sync {
    /// Returns whether the loaded content belongs to this handler.
    ///
    /// On success the handler should also record what it recognised in the
    /// session (at least `session.game`), which saves a second round trip.
    async fn validate_rom(&self, session: &mut Session) -> Result<bool, RetroLinkError>;

    /// Fills in `session.auth` ahead of authenticating upstream, for games
    /// that store the slot name in the patched ROM. Leaving it unset makes the
    /// host ask the player instead.
    async fn set_auth(&self, _session: &mut Session) -> Result<(), RetroLinkError> {
        Ok(())
    }

    /// Runs once per watcher tick while this handler is bound. The content is
    /// guaranteed to have passed `validate_rom` and the emulator is very
    /// likely to be connected.
    async fn game_watcher(&self, session: &mut Session) -> Result<(), RetroLinkError>;

    /// Receives messages the host got from its upstream server.
    fn on_package(&self, _session: &mut Session, _cmd: &str, _args: &Value) {}
}

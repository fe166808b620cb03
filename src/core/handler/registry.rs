// src/core/handler/registry.rs

//! Defines `HandlerRegistry`, the startup-time table of game handlers.

use super::GameHandler;
use super::session::Session;
use crate::core::RetroLinkError;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// One row of the table.
struct Registration {
    systems: BTreeSet<String>,
    game: String,
    handler: Arc<dyn GameHandler>,
}

/// A handler selected for the loaded content.
#[derive(Clone)]
pub struct BoundHandler {
    pub game: String,
    pub handler: Arc<dyn GameHandler>,
}

impl fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHandler")
            .field("game", &self.game)
            .finish_non_exhaustive()
    }
}

/// Maps (system set, game) to a handler instance.
///
/// The table is filled in at startup and only read afterwards. Lookups walk
/// it in registration order, so when two handlers would both accept the same
/// content the one registered first wins.
#[derive(Default)]
pub struct HandlerRegistry {
    registrations: Vec<Registration>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler for `game` on every system in `systems`.
    ///
    /// Registering the same system set and game again replaces the earlier
    /// handler but keeps its place in the lookup order.
    pub fn register<I, S>(
        &mut self,
        systems: I,
        game: impl Into<String>,
        handler: Arc<dyn GameHandler>,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let systems: BTreeSet<String> = systems.into_iter().map(Into::into).collect();
        let game = game.into();

        if let Some(existing) = self
            .registrations
            .iter_mut()
            .find(|r| r.systems == systems && r.game == game)
        {
            warn!("Replacing the handler registered for '{}' on {:?}", game, systems);
            existing.handler = handler;
            return self;
        }

        debug!("Registered handler for '{}' on {:?}", game, systems);
        self.registrations.push(Registration {
            systems,
            game,
            handler,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// The games registered for `system`, in lookup order.
    pub fn games_for<'a>(&'a self, system: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.registrations
            .iter()
            .filter(move |r| r.systems.contains(system))
            .map(|r| r.game.as_str())
    }

    /// Asks each handler registered for `system`, in order, whether it accepts
    /// the loaded content, and returns the first that does.
    ///
    /// Validation may change `session`. An error from a validator (typically a
    /// failed request to the emulator) ends the lookup and is returned.
    pub async fn lookup(
        &self,
        session: &mut Session,
        system: &str,
    ) -> Result<Option<BoundHandler>, RetroLinkError> {
        for registration in self
            .registrations
            .iter()
            .filter(|r| r.systems.contains(system))
        {
            if registration.handler.validate_rom(session).await? {
                debug!("Handler for '{}' accepted the loaded content", registration.game);
                return Ok(Some(BoundHandler {
                    game: registration.game.clone(),
                    handler: registration.handler.clone(),
                }));
            }
        }
        Ok(None)
    }
}

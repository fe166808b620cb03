// src/core/handler/session.rs

//! Defines the state shared between the watcher loop and the bound game handler.

use crate::core::client::EmulatorClient;
use serde_json::Value;
use std::time::Duration;

/// Where the host stands in authenticating with its upstream server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStatus {
    #[default]
    NotAuthenticated,
    /// Waiting for the handler or the user to supply a slot name.
    NeedInfo,
    /// Credentials were handed to the host; waiting for the server.
    Pending,
    Authenticated,
}

/// Holds the state specific to one controller session.
///
/// Handlers receive `&mut Session` in every hook. Validation is expected to
/// fill in `game` (and `items_handling` if the game needs it) once it has
/// recognised the loaded content.
#[derive(Debug)]
pub struct Session {
    /// The client used for every request to the emulator.
    pub client: EmulatorClient,
    /// The game the bound handler serves.
    pub game: Option<String>,
    /// The slot name used when authenticating upstream.
    pub auth: Option<String>,
    /// Item-handling flags announced upstream when authenticating.
    pub items_handling: Option<u8>,
    /// Slot data received with the upstream `Connected` message.
    pub slot_data: Option<Value>,
    pub auth_status: AuthStatus,
    /// The content checksum seen on the previous tick.
    pub rom_crc: Option<String>,
    /// The longest the watcher sleeps between ticks when nothing wakes it.
    pub watcher_interval: Duration,
}

impl Session {
    /// Creates a new `Session` with default values.
    pub fn new(client: EmulatorClient, watcher_interval: Duration) -> Self {
        Self {
            client,
            game: None,
            auth: None,
            items_handling: None,
            slot_data: None,
            auth_status: AuthStatus::NotAuthenticated,
            rom_crc: None,
            watcher_interval,
        }
    }

    /// Forgets everything tied to the previously loaded content.
    pub fn reset_for_new_content(&mut self) {
        self.game = None;
        self.auth = None;
        self.items_handling = None;
        self.slot_data = None;
        self.auth_status = AuthStatus::NotAuthenticated;
    }
}

// tests/integration/fixtures.rs

//! Common test fixtures: handlers, hosts and well-known content strings.

use async_trait::async_trait;
use parking_lot::Mutex;
use retrolink::core::handler::{GameHandler, Session};
use retrolink::core::RetroLinkError;
use retrolink::watcher::HostSession;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SNES_CONTENT_PATCHED: &str = "super_nes,Test Game (USA),crc32=99887766";
pub const GENESIS_CONTENT: &str = "mega_drive,Other Game,crc32=00c0ffee";

/// A game handler that counts calls and records what it is handed.
#[derive(Default)]
pub struct RecordingHandler {
    /// What `validate_rom` answers.
    pub accept: bool,
    /// Written to `session.game` on a successful validation, if set.
    pub claims_game: Option<String>,
    /// Written to `session.auth` by `set_auth`, if set.
    pub auth_name: Option<String>,
    /// When set, `validate_rom` reads this region from the emulator first.
    pub identity_read: Option<u64>,
    /// When set, `game_watcher` reads this region on every tick.
    pub tick_read: Option<u64>,
    pub validations: AtomicUsize,
    pub ticks: AtomicUsize,
    pub auth_calls: AtomicUsize,
    pub packages: Mutex<Vec<String>>,
}

impl RecordingHandler {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            accept: true,
            ..Self::default()
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn validations(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }

    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GameHandler for RecordingHandler {
    async fn validate_rom(&self, session: &mut Session) -> Result<bool, RetroLinkError> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        if let Some(address) = self.identity_read {
            session.client.read(&[(address, 1).into()]).await?;
        }
        if self.accept {
            if let Some(game) = &self.claims_game {
                session.game = Some(game.clone());
                session.items_handling = Some(0b111);
            }
        }
        Ok(self.accept)
    }

    async fn set_auth(&self, session: &mut Session) -> Result<(), RetroLinkError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(name) = &self.auth_name {
            session.auth = Some(name.clone());
        }
        Ok(())
    }

    async fn game_watcher(&self, session: &mut Session) -> Result<(), RetroLinkError> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        if let Some(address) = self.tick_read {
            session.client.read(&[(address, 2).into()]).await?;
        }
        Ok(())
    }

    fn on_package(&self, _session: &mut Session, cmd: &str, _args: &Value) {
        self.packages.lock().push(cmd.to_string());
    }
}

/// What a `RecordingHost` was asked to do.
#[derive(Debug, Default)]
pub struct HostLog {
    pub linked: bool,
    pub drops: usize,
    /// The `session.auth` value seen by each `authenticate` call.
    pub authentications: Vec<Option<String>>,
}

/// A host whose calls are observable from the test.
#[derive(Clone, Default)]
pub struct RecordingHost {
    pub log: Arc<Mutex<HostLog>>,
}

impl RecordingHost {
    pub fn linked() -> Self {
        let host = Self::default();
        host.log.lock().linked = true;
        host
    }
}

#[async_trait]
impl HostSession for RecordingHost {
    fn is_linked(&self) -> bool {
        self.log.lock().linked
    }

    async fn drop_link(&mut self) {
        let mut log = self.log.lock();
        log.drops += 1;
        log.linked = false;
    }

    async fn authenticate(&mut self, session: &Session) {
        self.log.lock().authentications.push(session.auth.clone());
    }
}

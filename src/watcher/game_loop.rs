// src/watcher/game_loop.rs

//! Implements the polling loop that keeps the emulator link alive and drives
//! the bound game handler.

use super::host::{HostMessage, HostSession};
use crate::connection::ConnectionState;
use crate::core::RetroLinkError;
use crate::core::handler::{AuthStatus, BoundHandler, HandlerRegistry, Session};
use std::sync::Arc;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// What a single tick of the loop achieved.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No socket could be opened; nothing else ran.
    WaitingForConnection,
    /// No registered handler accepts the loaded content.
    NoHandler,
    /// The bound handler's per-tick hook ran.
    Handled,
    /// A request failed and the rest of the tick was skipped.
    Aborted(RetroLinkError),
}

/// Tracks which one-off notices have been shown, so each state change is
/// logged once instead of on every tick.
#[derive(Debug, Default)]
struct Notices {
    connecting: bool,
    connected: bool,
    no_handler: bool,
    version_checked: bool,
    /// The last failure reported while the link stayed up. Repeats of it go to debug.
    last_failure: Option<RetroLinkError>,
}

/// Why the loop woke up.
enum Wake {
    Shutdown,
    Message(HostMessage),
    Tick,
}

/// The host's side of a running watcher.
#[derive(Debug, Clone)]
pub struct WatcherHandle {
    wake: Arc<Notify>,
    messages: mpsc::UnboundedSender<HostMessage>,
    shutdown: broadcast::Sender<()>,
    state: watch::Receiver<ConnectionState>,
}

impl WatcherHandle {
    /// Runs the next tick now instead of waiting out the polling interval.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Forwards an upstream message to the bound handler. Returns false if
    /// the watcher has already stopped.
    pub fn deliver(&self, message: HostMessage) -> bool {
        self.messages.send(message).is_ok()
    }

    /// Asks the loop to stop after the tick in progress, if any.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// The link state as of the end of the last tick.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that is notified whenever the link state changes.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

/// The single task that owns a session and drives it.
pub struct GameWatcher {
    session: Session,
    registry: Arc<HandlerRegistry>,
    host: Box<dyn HostSession>,
    bound: Option<BoundHandler>,
    expected_version: Option<String>,
    notices: Notices,
    wake: Arc<Notify>,
    messages: mpsc::UnboundedReceiver<HostMessage>,
    shutdown_rx: broadcast::Receiver<()>,
    state_tx: watch::Sender<ConnectionState>,
}

impl GameWatcher {
    /// Creates a watcher and the handle the host uses to steer it.
    pub fn new(
        session: Session,
        registry: Arc<HandlerRegistry>,
        host: Box<dyn HostSession>,
    ) -> (Self, WatcherHandle) {
        let wake = Arc::new(Notify::new());
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (state_tx, state_rx) = watch::channel(session.client.connection_state());

        let watcher = Self {
            session,
            registry,
            host,
            bound: None,
            expected_version: None,
            notices: Notices::default(),
            wake: wake.clone(),
            messages: messages_rx,
            shutdown_rx,
            state_tx,
        };
        let handle = WatcherHandle {
            wake,
            messages: messages_tx,
            shutdown: shutdown_tx,
            state: state_rx,
        };
        (watcher, handle)
    }

    /// Sets the emulator version to compare against after each connect.
    pub fn with_expected_version(mut self, version: Option<String>) -> Self {
        self.expected_version = version;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// The game of the bound handler, if one is bound.
    pub fn bound_game(&self) -> Option<&str> {
        self.bound.as_ref().map(|b| b.game.as_str())
    }

    /// Runs until the host asks to stop or drops every handle.
    pub async fn run(mut self) {
        info!(
            "Watcher started for {}:{} with polling interval {:?}",
            self.session.client.connection().host(),
            self.session.client.connection().port(),
            self.session.watcher_interval
        );

        loop {
            let wake = tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => Wake::Shutdown,
                Some(message) = self.messages.recv() => Wake::Message(message),
                _ = self.wake.notified() => Wake::Tick,
                _ = tokio::time::sleep(self.session.watcher_interval) => Wake::Tick,
            };

            match wake {
                Wake::Shutdown => break,
                Wake::Message(message) => self.deliver_message(message),
                Wake::Tick => {}
            }

            self.tick().await;
        }

        info!("Watcher stopping.");
        self.session.client.disconnect();
        self.publish_state();
    }

    /// Hands an upstream message to the session and the bound handler.
    pub fn deliver_message(&mut self, message: HostMessage) {
        if message.cmd == "Connected" {
            self.session.slot_data = message.args.get("slot_data").cloned();
            self.session.auth_status = AuthStatus::Authenticated;
        }

        if let Some(bound) = &self.bound {
            bound
                .handler
                .on_package(&mut self.session, &message.cmd, &message.args);
        }
    }

    /// Runs one pass: reconnect if needed, refresh status, bind a handler and
    /// run it. Any failed request ends the pass early; the next tick retries.
    pub async fn tick(&mut self) -> TickOutcome {
        let outcome = match self.try_tick().await {
            Ok(outcome) => {
                if outcome == TickOutcome::Handled {
                    self.notices.last_failure = None;
                }
                outcome
            }
            Err(e) => {
                self.report_failure(&e);
                TickOutcome::Aborted(e)
            }
        };
        self.publish_state();
        outcome
    }

    fn publish_state(&self) {
        let state = self.session.client.connection_state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    async fn try_tick(&mut self) -> Result<TickOutcome, RetroLinkError> {
        if self.session.client.connection_state() == ConnectionState::NotConnected {
            self.notices.connected = false;

            if !self.notices.connecting {
                info!("Waiting to connect to the emulator...");
                self.notices.connecting = true;
            }

            if !self.session.client.connect().await {
                return Ok(TickOutcome::WaitingForConnection);
            }

            self.notices.no_handler = false;
            self.notices.version_checked = false;
            self.notices.last_failure = None;
        }

        if !self.notices.version_checked {
            let version = self.session.client.version().await?;
            self.check_version(&version);
            self.notices.version_checked = true;
        }

        self.notices.connecting = false;

        self.session.client.status().await?;

        if !self.notices.connected {
            self.notices.connected = true;
            info!("Connected to the emulator");
        }

        let rom_crc = self.session.client.content_crc().await?;
        if self.session.rom_crc.is_some() && self.session.rom_crc != rom_crc {
            if self.host.is_linked() {
                info!("ROM changed. Disconnecting from server.");
            }
            self.bound = None;
            self.session.reset_for_new_content();
            self.host.drop_link().await;
        }
        self.session.rom_crc = rom_crc;

        let bound = match self.bound.clone() {
            Some(bound) => bound,
            None => match self.bind_handler().await? {
                Some(bound) => bound,
                None => return Ok(TickOutcome::NoHandler),
            },
        };

        if self.host.is_linked() {
            if self.session.auth_status == AuthStatus::NotAuthenticated {
                self.prime_auth(&bound).await?;
            }
        } else {
            self.session.auth_status = AuthStatus::NotAuthenticated;
        }

        bound.handler.game_watcher(&mut self.session).await?;
        Ok(TickOutcome::Handled)
    }

    /// Looks up a handler for the running core and binds it.
    async fn bind_handler(&mut self) -> Result<Option<BoundHandler>, RetroLinkError> {
        let found = match self.session.client.core_type().await? {
            Some(system) => self.registry.lookup(&mut self.session, &system).await?,
            None => None,
        };

        let Some(bound) = found else {
            if !self.notices.no_handler {
                info!("No handler was found for this game");
                self.notices.no_handler = true;
            }
            return Ok(None);
        };

        self.notices.no_handler = false;
        info!("Running handler for {}", bound.game);
        if self.session.game.is_none() {
            self.session.game = Some(bound.game.clone());
        }
        self.bound = Some(bound.clone());
        Ok(Some(bound))
    }

    /// Gives the handler a chance to supply credentials, then asks the host to authenticate.
    async fn prime_auth(&mut self, bound: &BoundHandler) -> Result<(), RetroLinkError> {
        if self.session.auth.is_none() {
            self.session.auth_status = AuthStatus::NeedInfo;
            bound.handler.set_auth(&mut self.session).await?;
        }
        self.host.authenticate(&self.session).await;
        self.session.auth_status = AuthStatus::Pending;
        Ok(())
    }

    fn check_version(&self, version: &str) {
        match &self.expected_version {
            Some(expected) if expected != version => warn!(
                "Emulator reports version {}, expected {}. Continuing anyway.",
                version, expected
            ),
            _ => info!("Emulator version {}", version),
        }
    }

    /// Logs a failed tick.
    ///
    /// Losing the link is reported once, when a link that was shown as
    /// connected goes away; repeats while it stays down only go to debug.
    /// Failures on a healthy link (an emulator error reply, a bad echo) are
    /// reported once per run of identical failures.
    fn report_failure(&mut self, error: &RetroLinkError) {
        let link_down = error.is_connection_loss()
            || self.session.client.connection_state() == ConnectionState::NotConnected;

        if link_down {
            self.notices.last_failure = None;
            if self.notices.connected {
                info!("Lost connection to the emulator: {}", error);
                self.notices.connected = false;
            } else {
                debug!("Emulator still unreachable: {}", error);
            }
            return;
        }

        if self.notices.last_failure.as_ref() == Some(error) {
            debug!("Request to the emulator failed again: {}", error);
            return;
        }
        if error.is_retryable() {
            info!("Request to the emulator failed: {}", error);
        } else {
            warn!("Request to the emulator failed: {}", error);
        }
        self.notices.last_failure = Some(error.clone());
    }
}

// src/connection/manager.rs

//! Defines `ConnectionManager`, the lifecycle state machine around the transport.

use super::multiplexer::TransactionMultiplexer;
use super::transport::Transport;
use crate::core::RetroLinkError;
use crate::core::protocol::Command;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// The lifecycle state of the link to the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket is held.
    NotConnected,
    /// A socket is open but the emulator has not answered anything yet.
    Tentative,
    /// At least one transaction completed on the current socket.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::NotConnected => f.write_str("Not Connected"),
            ConnectionState::Tentative => f.write_str("Tentatively Connected"),
            ConnectionState::Connected => f.write_str("Connected"),
        }
    }
}

/// Owns the transport exclusively and tracks whether it is trusted.
///
/// All I/O goes through `&mut self`, so a second transaction cannot start
/// while one is outstanding.
#[derive(Debug)]
pub struct ConnectionManager {
    host: String,
    port: u16,
    transport: Transport,
    multiplexer: TransactionMultiplexer,
    state: ConnectionState,
}

impl ConnectionManager {
    /// Creates a manager for `host:port`. No socket is opened until `connect`.
    pub fn new(host: impl Into<String>, port: u16, request_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            transport: Transport::new(),
            multiplexer: TransactionMultiplexer::new(request_timeout),
            state: ConnectionState::NotConnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Opens the transport and enters `Tentative`.
    ///
    /// Returns false, leaving the manager in `NotConnected`, if the socket
    /// could not be opened.
    pub async fn connect(&mut self) -> bool {
        match self.transport.open(&self.host, self.port).await {
            Ok(()) => {
                self.state = ConnectionState::Tentative;
                debug!("Tentatively connected to {}:{}", self.host, self.port);
                true
            }
            Err(e) => {
                debug!("Could not open socket to {}:{}: {}", self.host, self.port, e);
                self.transport.close();
                self.state = ConnectionState::NotConnected;
                false
            }
        }
    }

    /// Closes the transport. Safe to call in any state.
    pub fn disconnect(&mut self) {
        self.transport.close();
        self.state = ConnectionState::NotConnected;
    }

    /// Runs one batched transaction and returns the replies in command order.
    ///
    /// A success while `Tentative` promotes the link to `Connected`. A
    /// peer-closed reply or a socket fault drops the transport.
    pub async fn transact(&mut self, commands: &[Command]) -> Result<Vec<String>, RetroLinkError> {
        if !self.transport.is_open() {
            return Err(RetroLinkError::NotConnected);
        }

        match self.multiplexer.transact(&mut self.transport, commands).await {
            Ok(replies) => {
                if self.state == ConnectionState::Tentative && !commands.is_empty() {
                    debug!("Emulator at {}:{} answered; link confirmed", self.host, self.port);
                    self.state = ConnectionState::Connected;
                }
                Ok(replies)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Sends a command that has no reply. Commands that do expect one must
    /// go through `transact`, or their reply would be left on the socket.
    pub async fn send_only(&mut self, command: &Command) -> Result<(), RetroLinkError> {
        if command.expects_reply() {
            return Err(RetroLinkError::InvalidRequest(format!(
                "{} expects a reply; use a transaction",
                command.name()
            )));
        }
        if !self.transport.is_open() {
            return Err(RetroLinkError::NotConnected);
        }

        let line = command.to_line();
        match self.transport.send(line.as_bytes()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Tears the link down if the error means the peer is gone.
    fn fail(&mut self, error: &RetroLinkError) {
        if matches!(
            error,
            RetroLinkError::PeerClosed | RetroLinkError::ConnectionFault(_)
        ) {
            debug!("Dropping link to {}:{}: {}", self.host, self.port, error);
            self.disconnect();
        }
    }
}

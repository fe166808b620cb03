// src/connection/multiplexer.rs

//! Batches several commands into one datagram and collects their replies in order.

use super::transport::Transport;
use crate::core::RetroLinkError;
use crate::core::protocol::{Command, encode_batch};
use std::time::Duration;
use tracing::debug;

/// Correlates replies with requests by position.
///
/// The wire protocol has no request identifier: the emulator answers each
/// line of a batch with one datagram, in order. Correlation therefore rests on
/// two rules, both enforced here: stale datagrams are drained before a batch
/// is sent, and the caller never has two batches in flight.
#[derive(Debug, Clone, Copy)]
pub struct TransactionMultiplexer {
    timeout: Duration,
}

impl TransactionMultiplexer {
    /// Creates a multiplexer whose receives each wait at most `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The per-receive timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `commands` as one datagram and returns one reply per command, in order.
    ///
    /// Every command in the batch must expect a reply; a batch holding a
    /// reply-less command is refused with `InvalidRequest` before anything is
    /// sent. A receive timeout yields `RequestFailed`; a zero-length datagram
    /// yields `PeerClosed` and the caller is expected to tear the transport down.
    pub async fn transact(
        &self,
        transport: &mut Transport,
        commands: &[Command],
    ) -> Result<Vec<String>, RetroLinkError> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(command) = commands.iter().find(|c| !c.expects_reply()) {
            return Err(RetroLinkError::InvalidRequest(format!(
                "{} has no reply and cannot be part of a transaction",
                command.name()
            )));
        }

        transport.drain().await?;
        let payload = encode_batch(commands);
        transport.send(payload.as_bytes()).await?;

        let mut replies = Vec::with_capacity(commands.len());
        for (index, command) in commands.iter().enumerate() {
            let datagram = match transport.receive(self.timeout).await {
                Ok(datagram) => datagram,
                Err(RetroLinkError::Timeout) => {
                    debug!(
                        "No reply to {} ({} of {}) within {:?}",
                        command.name(),
                        index + 1,
                        commands.len(),
                        self.timeout
                    );
                    return Err(RetroLinkError::RequestFailed(format!(
                        "timed out waiting for a reply to {}",
                        command.name()
                    )));
                }
                Err(e) => return Err(e),
            };

            if datagram.is_empty() {
                return Err(RetroLinkError::PeerClosed);
            }

            match String::from_utf8(datagram) {
                Ok(text) if text.is_ascii() => {
                    replies.push(text.trim_end_matches(['\r', '\n', '\0']).to_string());
                }
                _ => {
                    transport.drain().await?;
                    return Err(RetroLinkError::RequestFailed(format!(
                        "malformed reply to {}",
                        command.name()
                    )));
                }
            }
        }

        Ok(replies)
    }
}

// src/core/client.rs

//! Defines `EmulatorClient`, the status and memory-access API built on the connection manager.
//!
//! Memory operations come in guarded and unguarded forms. A guarded operation
//! runs two transactions back to back: the first reads every guard region and
//! compares it with the expected bytes, and the second performs the actual
//! reads or writes only if every guard matched. The emulator keeps running
//! between the two, so a guard narrows the race window but does not close it.

use crate::connection::{ConnectionManager, ConnectionState};
use crate::core::RetroLinkError;
use crate::core::protocol::reply::{parse_read_reply, parse_status, parse_write_reply};
use crate::core::protocol::{Command, ContentInfo, EmulatorState, StatusInfo};
use bytes::Bytes;
use tracing::debug;

/// A region of core memory to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub address: u64,
    pub length: usize,
}

impl ReadRequest {
    pub fn new(address: u64, length: usize) -> Self {
        Self { address, length }
    }
}

impl From<(u64, usize)> for ReadRequest {
    fn from((address, length): (u64, usize)) -> Self {
        Self { address, length }
    }
}

/// Bytes to write into core memory starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub address: u64,
    pub data: Bytes,
}

impl WriteRequest {
    pub fn new(address: u64, data: impl Into<Bytes>) -> Self {
        Self {
            address,
            data: data.into(),
        }
    }
}

/// A precondition: the memory at `address` must currently hold `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub address: u64,
    pub expected: Bytes,
}

impl Guard {
    pub fn new(address: u64, expected: impl Into<Bytes>) -> Self {
        Self {
            address,
            expected: expected.into(),
        }
    }
}

/// The status and memory-access client for one emulator.
#[derive(Debug)]
pub struct EmulatorClient {
    conn: ConnectionManager,
    /// The last parsed status. Cleared whenever the socket changes.
    info: Option<StatusInfo>,
}

impl EmulatorClient {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn, info: None }
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.conn
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// Opens a fresh socket. Cached status from any earlier socket is discarded.
    pub async fn connect(&mut self) -> bool {
        self.info = None;
        self.conn.connect().await
    }

    pub fn disconnect(&mut self) {
        self.info = None;
        self.conn.disconnect();
    }

    /// Runs a raw transaction. Prefer the typed operations below.
    pub async fn transact(&mut self, commands: &[Command]) -> Result<Vec<String>, RetroLinkError> {
        let result = self.conn.transact(commands).await;
        if self.conn.state() == ConnectionState::NotConnected {
            self.info = None;
        }
        result
    }

    async fn send_only(&mut self, command: Command) -> Result<(), RetroLinkError> {
        let result = self.conn.send_only(&command).await;
        if self.conn.state() == ConnectionState::NotConnected {
            self.info = None;
        }
        result
    }

    /// Returns the emulator's version string.
    pub async fn version(&mut self) -> Result<String, RetroLinkError> {
        let replies = self.transact(&[Command::GetVersion]).await?;
        Ok(replies.into_iter().next().unwrap_or_default())
    }

    /// Queries the current status and refreshes the cache.
    pub async fn status(&mut self) -> Result<StatusInfo, RetroLinkError> {
        let replies = self.transact(&[Command::GetStatus]).await?;
        let line = replies.first().map(String::as_str).unwrap_or_default();
        let status = parse_status(line)?;
        self.info = Some(status.clone());
        Ok(status)
    }

    /// The status cached by the last successful `status` call, if any.
    pub fn cached_status(&self) -> Option<&StatusInfo> {
        self.info.as_ref()
    }

    /// Returns the loaded content, querying only if nothing is cached.
    pub async fn content(&mut self) -> Result<Option<ContentInfo>, RetroLinkError> {
        if let Some(info) = &self.info {
            return Ok(info.content.clone());
        }
        Ok(self.status().await?.content)
    }

    /// The system identifier of the running core.
    pub async fn core_type(&mut self) -> Result<Option<String>, RetroLinkError> {
        Ok(self.content().await?.map(|c| c.core_type))
    }

    /// The name of the loaded ROM.
    pub async fn rom_name(&mut self) -> Result<Option<String>, RetroLinkError> {
        Ok(self.content().await?.map(|c| c.rom_name))
    }

    /// The checksum of the loaded content.
    pub async fn content_crc(&mut self) -> Result<Option<String>, RetroLinkError> {
        Ok(self.content().await?.map(|c| c.crc))
    }

    /// Reads every region in `reads` if, and only if, every guard matches.
    ///
    /// Returns `Ok(None)` when a guard does not hold; that is an ordinary
    /// outcome, not an error. Otherwise returns the data in request order.
    pub async fn guarded_read(
        &mut self,
        reads: &[ReadRequest],
        guards: &[Guard],
    ) -> Result<Option<Vec<Bytes>>, RetroLinkError> {
        if !self.check_guards(guards).await? {
            return Ok(None);
        }

        let commands: Vec<Command> = reads
            .iter()
            .map(|r| Command::ReadCoreMemory {
                address: r.address,
                length: r.length,
            })
            .collect();
        let replies = self.transact(&commands).await?;

        let mut result = Vec::with_capacity(reads.len());
        for (request, line) in reads.iter().zip(&replies) {
            let reply = parse_read_reply(line)?;
            if reply.address != request.address || reply.data.len() != request.length {
                return Err(RetroLinkError::ProtocolViolation(format!(
                    "expected {} bytes at {:#x}, got {} bytes at {:#x}",
                    request.length,
                    request.address,
                    reply.data.len(),
                    reply.address
                )));
            }
            result.push(reply.data);
        }
        Ok(Some(result))
    }

    /// Reads every region in `reads`, in request order.
    pub async fn read(&mut self, reads: &[ReadRequest]) -> Result<Vec<Bytes>, RetroLinkError> {
        Ok(self.guarded_read(reads, &[]).await?.unwrap_or_default())
    }

    /// Writes every entry in `writes` if, and only if, every guard matches.
    ///
    /// Returns `Ok(false)` when a guard does not hold. Once the guards have
    /// passed, any disagreement in the write replies is a `ProtocolViolation`.
    pub async fn guarded_write(
        &mut self,
        writes: &[WriteRequest],
        guards: &[Guard],
    ) -> Result<bool, RetroLinkError> {
        if !self.check_guards(guards).await? {
            return Ok(false);
        }

        let commands: Vec<Command> = writes
            .iter()
            .map(|w| Command::WriteCoreMemory {
                address: w.address,
                data: w.data.clone(),
            })
            .collect();
        let replies = self.transact(&commands).await?;

        for (request, line) in writes.iter().zip(&replies) {
            let reply = parse_write_reply(line)?;
            if reply.address != request.address || reply.written != request.data.len() {
                return Err(RetroLinkError::ProtocolViolation(format!(
                    "expected {} bytes written at {:#x}, emulator reported {} at {:#x}",
                    request.data.len(),
                    request.address,
                    reply.written,
                    reply.address
                )));
            }
        }
        Ok(true)
    }

    /// Writes every entry in `writes`. With no guards the result is always
    /// `Ok(true)` unless the request fails.
    pub async fn write(&mut self, writes: &[WriteRequest]) -> Result<bool, RetroLinkError> {
        self.guarded_write(writes, &[]).await
    }

    /// Reads all guard regions in one transaction and compares them with the expected bytes.
    ///
    /// Every reply is checked for a matching echo before any comparison is
    /// judged, so a misattributed reply is always reported as a violation.
    async fn check_guards(&mut self, guards: &[Guard]) -> Result<bool, RetroLinkError> {
        if guards.is_empty() {
            return Ok(true);
        }

        let commands: Vec<Command> = guards
            .iter()
            .map(|g| Command::ReadCoreMemory {
                address: g.address,
                length: g.expected.len(),
            })
            .collect();
        let replies = self.transact(&commands).await?;

        let mut passed = true;
        for (guard, line) in guards.iter().zip(&replies) {
            let reply = parse_read_reply(line)?;
            if reply.address != guard.address {
                return Err(RetroLinkError::ProtocolViolation(format!(
                    "guard read for {:#x} answered for {:#x}",
                    guard.address, reply.address
                )));
            }
            if reply.data != guard.expected {
                debug!(
                    "Guard at {:#x} failed: expected {}, found {}",
                    guard.address,
                    hex::encode(&guard.expected),
                    hex::encode(&reply.data)
                );
                passed = false;
            }
        }
        Ok(passed)
    }

    /// Shows `text` in the emulator's on-screen message queue.
    pub async fn display_message(&mut self, text: &str) -> Result<(), RetroLinkError> {
        self.send_only(Command::ShowMsg(text.to_string())).await
    }

    /// Freezes emulation so several requests can observe the same frame.
    ///
    /// Does nothing if the emulator already reports itself paused. Remember to
    /// `unlock` afterwards.
    pub async fn lock(&mut self) -> Result<(), RetroLinkError> {
        if self.status().await?.state != EmulatorState::Paused {
            self.send_only(Command::FrameAdvance).await?;
        }
        Ok(())
    }

    /// Resumes emulation if it is paused.
    pub async fn unlock(&mut self) -> Result<(), RetroLinkError> {
        if self.status().await?.state == EmulatorState::Paused {
            self.send_only(Command::PauseToggle).await?;
        }
        Ok(())
    }
}

// src/core/protocol/reply.rs

//! Parsers for the single-line replies the emulator sends back.
//!
//! The protocol carries no request identifier, so every reply echoes the verb
//! of the command it answers (and, for memory commands, the address). The
//! parsers here check those echoes; a mismatch is reported as a
//! `ProtocolViolation`, while text that cannot be parsed at all is a
//! `RequestFailed`.

use super::command::Command;
use crate::core::RetroLinkError;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use strum_macros::EnumString;

/// The run state reported by `GET_STATUS`.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum EmulatorState {
    Playing,
    Paused,
    Contentless,
    #[strum(default)]
    Other(String),
}

impl fmt::Display for EmulatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulatorState::Playing => f.write_str("PLAYING"),
            EmulatorState::Paused => f.write_str("PAUSED"),
            EmulatorState::Contentless => f.write_str("CONTENTLESS"),
            EmulatorState::Other(s) => f.write_str(s),
        }
    }
}

/// Identity of the loaded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentInfo {
    /// The system identifier of the running core (e.g. `super_nes`).
    pub core_type: String,
    /// The name of the loaded ROM.
    pub rom_name: String,
    /// The content checksum as reported, e.g. `crc32=1a2b3c4d`.
    pub crc: String,
}

/// A parsed `GET_STATUS` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub state: EmulatorState,
    /// `None` when no content is loaded.
    pub content: Option<ContentInfo>,
}

/// A parsed `READ_CORE_MEMORY` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReply {
    pub address: u64,
    pub data: Bytes,
}

/// A parsed `WRITE_CORE_MEMORY` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReply {
    pub address: u64,
    pub written: usize,
}

/// Splits a reply into its echoed verb and the remainder, checking the verb.
fn split_tag<'a>(line: &'a str, expected: &Command) -> Result<&'a str, RetroLinkError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (tag, rest) = line.split_once(' ').unwrap_or((line, ""));
    if tag != expected.name() {
        return Err(RetroLinkError::ProtocolViolation(format!(
            "expected a {} reply, got '{tag}'",
            expected.name()
        )));
    }
    Ok(rest)
}

/// Parses a hexadecimal address, with or without a `0x` prefix.
pub fn parse_hex_address(s: &str) -> Result<u64, RetroLinkError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|_| RetroLinkError::RequestFailed(format!("malformed address '{s}'")))
}

/// Returns the emulator's error message if the payload is an error marker (`-1 <message>`).
fn emulator_error(payload: &str) -> Option<&str> {
    let rest = payload.strip_prefix("-1")?;
    if rest.is_empty() || rest.starts_with(' ') {
        Some(rest.trim())
    } else {
        None
    }
}

/// Parses `GET_STATUS <state>[ <core>,<rom>,<crc>]`.
///
/// The ROM name may itself contain commas, so the core is taken up to the
/// first comma and the checksum after the last one.
pub fn parse_status(line: &str) -> Result<StatusInfo, RetroLinkError> {
    let rest = split_tag(line, &Command::GetStatus)?;
    let (state, info) = rest.split_once(' ').unwrap_or((rest, ""));
    if state.is_empty() {
        return Err(RetroLinkError::RequestFailed(
            "status reply carries no state".to_string(),
        ));
    }
    let state = EmulatorState::from_str(state)
        .map_err(|_| RetroLinkError::RequestFailed(format!("unknown state '{state}'")))?;

    let content = if info.trim().is_empty() {
        None
    } else {
        let (core_type, rest) = info.split_once(',').ok_or_else(|| {
            RetroLinkError::RequestFailed(format!("malformed content info '{info}'"))
        })?;
        let (rom_name, crc) = rest.rsplit_once(',').ok_or_else(|| {
            RetroLinkError::RequestFailed(format!("malformed content info '{info}'"))
        })?;
        Some(ContentInfo {
            core_type: core_type.to_string(),
            rom_name: rom_name.to_string(),
            crc: crc.trim().to_string(),
        })
    };

    Ok(StatusInfo { state, content })
}

/// Parses `READ_CORE_MEMORY <hexaddr> <hexbytes>`. The bytes may be packed
/// (`a9ff`) or space separated (`a9 ff`).
pub fn parse_read_reply(line: &str) -> Result<ReadReply, RetroLinkError> {
    let rest = split_tag(line, &Command::ReadCoreMemory {
        address: 0,
        length: 0,
    })?;
    let (address, payload) = rest.split_once(' ').unwrap_or((rest, ""));
    let address = parse_hex_address(address)?;

    if let Some(message) = emulator_error(payload) {
        return Err(RetroLinkError::RequestFailed(format!(
            "emulator could not read {address:#x}: {message}"
        )));
    }

    let packed: String = payload.split_whitespace().collect();
    let data = hex::decode(packed)?;
    Ok(ReadReply {
        address,
        data: Bytes::from(data),
    })
}

/// Parses `WRITE_CORE_MEMORY <hexaddr> <bytecount>`.
pub fn parse_write_reply(line: &str) -> Result<WriteReply, RetroLinkError> {
    let rest = split_tag(line, &Command::WriteCoreMemory {
        address: 0,
        data: Bytes::new(),
    })?;
    let (address, payload) = rest.split_once(' ').unwrap_or((rest, ""));
    let address = parse_hex_address(address)?;

    if let Some(message) = emulator_error(payload) {
        return Err(RetroLinkError::RequestFailed(format!(
            "emulator could not write {address:#x}: {message}"
        )));
    }

    let written = payload.trim().parse::<usize>().map_err(|_| {
        RetroLinkError::RequestFailed(format!("malformed byte count '{}'", payload.trim()))
    })?;
    Ok(WriteReply { address, written })
}

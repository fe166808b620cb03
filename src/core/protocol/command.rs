// src/core/protocol/command.rs

//! The network commands understood by the emulator and their wire encoding.

use bytes::Bytes;
use std::fmt::{self, Write as _};
use strum_macros::IntoStaticStr;

/// A single network command. Each command renders to one ASCII line without
/// a trailing newline; batching joins several lines with `\n`.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Asks for the emulator's version string.
    GetVersion,
    /// Asks for the run state and the loaded content.
    GetStatus,
    /// Pushes a line of text onto the on-screen message queue. No reply.
    /// Characters outside ASCII are sent as `?`.
    ShowMsg(String),
    /// Advances one frame, pausing emulation if it was running. No reply.
    #[strum(serialize = "FRAMEADVANCE")]
    FrameAdvance,
    /// Flips the paused state. No reply.
    PauseToggle,
    /// Reads `length` bytes of core memory starting at `address`.
    ReadCoreMemory { address: u64, length: usize },
    /// Writes `data` into core memory starting at `address`.
    WriteCoreMemory { address: u64, data: Bytes },
}

impl Command {
    /// Returns the verb of the command, which is also the tag echoed in its reply.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Returns true for commands the emulator answers with exactly one datagram.
    pub fn expects_reply(&self) -> bool {
        !matches!(
            self,
            Command::ShowMsg(_) | Command::FrameAdvance | Command::PauseToggle
        )
    }

    /// Renders the command as its wire line.
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            Command::GetVersion
            | Command::GetStatus
            | Command::FrameAdvance
            | Command::PauseToggle => f.write_str(name),
            Command::ShowMsg(text) => {
                write!(f, "{name} ")?;
                for c in text.chars() {
                    match c {
                        // A newline would split the message into a second command.
                        '\r' | '\n' => f.write_char(' ')?,
                        c if c.is_ascii() => f.write_char(c)?,
                        _ => f.write_char('?')?,
                    }
                }
                Ok(())
            }
            Command::ReadCoreMemory { address, length } => {
                write!(f, "{name} {address:x} {length}")
            }
            Command::WriteCoreMemory { address, data } => {
                write!(f, "{name} {address:x}")?;
                for byte in data.iter() {
                    write!(f, " {byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Joins a batch of commands into the payload of a single datagram.
pub fn encode_batch(commands: &[Command]) -> String {
    commands
        .iter()
        .map(Command::to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

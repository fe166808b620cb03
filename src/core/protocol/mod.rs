// src/core/protocol/mod.rs

pub mod command;
pub mod reply;
pub use command::{Command, encode_batch};
pub use reply::{ContentInfo, EmulatorState, ReadReply, StatusInfo, WriteReply};

/// The emulator's default network command port.
pub const DEFAULT_PORT: u16 = 55355;
/// The largest datagram the emulator accepts.
pub const SEND_LIMIT: usize = 2 * 1024;
/// The largest datagram the client will receive.
pub const READ_LIMIT: usize = 64 * 1024;

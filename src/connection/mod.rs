// src/connection/mod.rs

//! The datagram link to the emulator: the socket, the batching layer that
//! correlates replies, and the lifecycle state machine on top of both.

mod manager;
mod multiplexer;
mod transport;

pub use manager::{ConnectionManager, ConnectionState};
pub use multiplexer::TransactionMultiplexer;
pub use transport::Transport;

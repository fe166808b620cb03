// src/core/mod.rs

//! The central module containing the protocol, the emulator client and the handler machinery.

pub mod client;
pub mod errors;
pub mod handler;
pub mod protocol;

pub use client::{EmulatorClient, Guard, ReadRequest, WriteRequest};
pub use errors::RetroLinkError;
pub use handler::{GameHandler, HandlerRegistry, Session};

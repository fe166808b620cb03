// src/lib.rs

pub mod config;
pub mod connection;
pub mod core;
pub mod watcher;

// Re-export
pub use crate::core::{EmulatorClient, RetroLinkError};
